pub mod attendance;
pub mod backup;
pub mod classes;
pub mod export;
pub mod matches;
pub mod session;
pub mod students;
pub mod sync;
pub mod teachers;
