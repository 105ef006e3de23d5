mod doctor;
mod package;

pub use doctor::doctor;
pub use package::package;
