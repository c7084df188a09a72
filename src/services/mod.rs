pub mod admin_service;
pub mod fanout_service;
pub mod notification_service;
pub mod order_service;
pub mod order_status_updater;
pub mod report_service;
