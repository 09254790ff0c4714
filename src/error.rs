use thiserror::Error;

#[derive(Debug, Error)]
pub enum CutError {
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("image has no pixels")]
    EmptyImage,
    #[error("could not rasterize piece {0}")]
    Raster(usize),
    #[error("invalid piece count {0}")]
    InvalidPieceCount(u32),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupingError {
    #[error("piece {piece} points at group {group} which does not list it")]
    BackReference { piece: usize, group: usize },
    #[error("piece {piece} is listed by {count} groups")]
    Membership { piece: usize, count: usize },
    #[error("group {0} is empty")]
    EmptyGroup(usize),
    #[error("group {group} lists unknown piece {piece}")]
    UnknownPiece { group: usize, piece: usize },
}
