pub mod artifact;
pub mod conversation;
pub mod draft;
pub mod slots;
