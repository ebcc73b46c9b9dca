pub mod entities;
pub mod validator;
pub mod value_objects;
