pub mod matcher;
pub mod model;
pub mod normalize;
pub mod structure;
pub mod validator;
