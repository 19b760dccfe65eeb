pub mod dispatch;
pub mod template;
