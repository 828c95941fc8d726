pub mod config;
pub mod error;
pub mod events;
pub mod manifest;
pub mod slideshow;
pub mod timers;
pub mod render {
    pub mod fade;
    pub mod layout;
    pub mod loader;
    pub mod viewer;
}
