pub mod command;
pub mod packet;
pub mod primitive;
pub mod response;
pub mod row;
pub mod r#trait;
pub mod value;
