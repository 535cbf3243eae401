pub mod announcements;
pub mod games;
pub mod me;
pub mod registration_requests;
pub mod root;
pub mod users;
