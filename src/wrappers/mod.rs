//! The bundled wrappers, one module per wrapped program.

mod convert;
mod game;
mod pip;
mod tar;
mod vi;
mod vlc;
mod wget;
mod which;
mod xz;

pub use convert::Convert;
pub use game::Game;
pub use pip::Pip;
pub use tar::Tar;
pub use vi::Vi;
pub use vlc::Vlc;
pub use wget::Wget;
pub use which::Which;
pub use xz::Xz;
