pub mod canvas;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod handles;
pub mod media;
pub mod playlist;
pub mod render {
    pub mod viewer;
}
pub mod scan;
pub mod view;
pub mod watch;
