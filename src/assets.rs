use std::collections::HashMap;

use iced::Color;
use lazy_static::lazy_static;
use shakmaty::{Color as Side, Role};

#[allow(dead_code)]
pub enum ImageResolution {
    X1,
    X2,
    Px128,
    Px256,
    Px512,
    Px1024,
}

impl ImageResolution {
    const fn folder(&self) -> &'static str {
        match self {
            ImageResolution::X1 => "1x",
            ImageResolution::X2 => "2x",
            ImageResolution::Px128 => "128px",
            ImageResolution::Px256 => "256px",
            ImageResolution::Px512 => "512px",
            ImageResolution::Px1024 => "1024px",
        }
    }

    const fn file_postfix(&self) -> &'static str {
        match self {
            ImageResolution::X1 => "1x",
            ImageResolution::X2 => "2x",
            ImageResolution::Px128 => "png_shadow_128px",
            ImageResolution::Px256 => "png_shadow_256px",
            ImageResolution::Px512 => "png_shadow_512px",
            ImageResolution::Px1024 => "png_shadow_1024px",
        }
    }
}

lazy_static! {
    pub static ref PIECE_IMAGES: HashMap<(Side, Role), String> =
        piece_image_mapping(ImageResolution::Px128);
}

fn piece_image_mapping(resolution: ImageResolution) -> HashMap<(Side, Role), String> {
    let base_path = "assets/JohnPablok_Cburnett_Chess_set/PNGs/with_shadow";

    let mut result = HashMap::new();

    for side in [Side::White, Side::Black] {
        let side_text = if side == Side::White { "w" } else { "b" };
        for role in [
            Role::King,
            Role::Queen,
            Role::Bishop,
            Role::Knight,
            Role::Rook,
            Role::Pawn,
        ] {
            let role_text = match role {
                Role::King => "king",
                Role::Queen => "queen",
                Role::Bishop => "bishop",
                Role::Knight => "knight",
                Role::Rook => "rook",
                Role::Pawn => "pawn",
            };
            result.insert(
                (side, role),
                format!(
                    "{}/{}/{}_{}_{}.png",
                    base_path,
                    resolution.folder(),
                    side_text,
                    role_text,
                    resolution.file_postfix()
                ),
            );
        }
    }

    result
}

/// Board square palette. `last_move` and `valid_move` are translucent
/// overlays painted over the base squares.
#[derive(Debug, Clone, Copy)]
pub struct BoardTheme {
    pub light: Color,
    pub dark: Color,
    pub last_move: Color,
    pub valid_move: Color,
}

pub const EMERALD: BoardTheme = BoardTheme {
    light: Color::from_rgb(0.93, 0.93, 0.82),
    dark: Color::from_rgb(0.46, 0.59, 0.34),
    last_move: Color::from_rgba(1.0, 0.94, 0.54, 0.5),
    valid_move: Color::from_rgba(0.0, 0.0, 0.0, 0.1),
};

pub const WOOD: BoardTheme = BoardTheme {
    light: Color::from_rgb(0.93, 0.81, 0.63),
    dark: Color::from_rgb(0.55, 0.27, 0.07),
    last_move: Color::from_rgba(0.98, 0.8, 0.08, 0.4),
    valid_move: Color::from_rgba(0.0, 0.0, 0.0, 0.2),
};

pub const SLATE: BoardTheme = BoardTheme {
    light: Color::from_rgb(0.8, 0.84, 0.88),
    dark: Color::from_rgb(0.28, 0.33, 0.41),
    last_move: Color::from_rgba(0.38, 0.65, 0.98, 0.5),
    valid_move: Color::from_rgba(0.0, 0.0, 0.0, 0.1),
};

pub fn theme(name: &str) -> BoardTheme {
    match name {
        "emerald" => EMERALD,
        "slate" => SLATE,
        _ => WOOD,
    }
}
