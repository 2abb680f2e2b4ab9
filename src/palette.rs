/*!
 # Named color palette

 This module defines the fixed set of named colors the bridge understands.
 Each name maps to a hue byte, spaced 0x10 apart around the color wheel.
*/

/// Predefined palette colors with their hue bytes
pub const PALETTE: [(&str, u8); 16] = [
    ("violet", 0x00),
    ("blue", 0x10),
    ("baby_blue", 0x20),
    ("aqua", 0x30),
    ("mint", 0x40),
    ("seafoam_green", 0x50),
    ("green", 0x60),
    ("lime_green", 0x70),
    ("yellow", 0x80),
    ("yellow_orange", 0x90),
    ("orange", 0xA0),
    ("red", 0xB0),
    ("pink", 0xC0),
    ("fusia", 0xD0),
    ("lilac", 0xE0),
    ("lavendar", 0xF0),
];

/// Looks up the hue byte for a palette name. Matching is exact.
pub fn hue_for(name: &str) -> Option<u8> {
    PALETTE
        .iter()
        .find(|(entry, _)| *entry == name)
        .map(|&(_, hue)| hue)
}

/// Iterates the palette names in hue order
pub fn names() -> impl Iterator<Item = &'static str> {
    PALETTE.iter().map(|&(name, _)| name)
}
