//! RGBA color with normalised channels and a `nom`-based CSS color parser.
//!
//! Accepted syntax: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`,
//! `hsl()`, `hsla()` and the CSS named colors (plus `transparent`).

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag_no_case, take_while_m_n, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, map_res, opt},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, pair, preceded},
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Could not parse color from value '{0}'")]
pub struct ColorParseError(pub String);

/// A color with `r`, `g`, `b` and `a` in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a color from 0-255 channels and a 0-1 alpha.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self {
            r: f64::from(r) / 255.0,
            g: f64::from(g) / 255.0,
            b: f64::from(b) / 255.0,
            a,
        }
    }

    /// Parses a CSS color string.
    pub fn parse(input: &str) -> Result<Color, ColorParseError> {
        let trimmed = input.trim();
        if let Some(color) = named_color(trimmed) {
            return Ok(color);
        }
        match all_consuming(css_color).parse(trimmed) {
            Ok((_, color)) => Ok(color),
            Err(_) => Err(ColorParseError(input.to_string())),
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Channel-wise linear interpolation.
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = |c: f64| (c * 255.0).round().clamp(0.0, 255.0);
        write!(
            f,
            "rgba({},{},{},{})",
            channel(self.r),
            channel(self.g),
            channel(self.b),
            self.a
        )
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

// --- Hex Parsers ---

fn hex_digit(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(1, 1, |c: char| c.is_ascii_hexdigit()), |s: &str| {
        u8::from_str_radix(s, 16).map(|d| d * 17)
    })
    .parse(input)
}

fn hex_pair(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |s: &str| {
        u8::from_str_radix(s, 16)
    })
    .parse(input)
}

fn hex_color(input: &str) -> IResult<&str, Color> {
    let (rest, digits) =
        preceded(char('#'), take_while1(|c: char| c.is_ascii_hexdigit())).parse(input)?;
    let channels = match digits.len() {
        3 | 4 => nom::multi::many1(hex_digit).parse(digits)?.1,
        6 | 8 => nom::multi::many1(hex_pair).parse(digits)?.1,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )));
        }
    };
    let alpha = channels.get(3).map_or(1.0, |a| f64::from(*a) / 255.0);
    Ok((rest, Color::from_rgba8(channels[0], channels[1], channels[2], alpha)))
}

// --- Functional Notation Parsers ---

/// A numeric argument, optionally a percentage.
#[derive(Debug, Clone, Copy)]
enum Component {
    Number(f64),
    Percent(f64),
}

fn component(input: &str) -> IResult<&str, Component> {
    map(pair(double, opt(char('%'))), |(value, percent)| match percent {
        Some(_) => Component::Percent(value),
        None => Component::Number(value),
    })
    .parse(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Component>> {
    delimited(
        pair(char('('), multispace0),
        separated_list1(delimited(multispace0, char(','), multispace0), component),
        pair(multispace0, char(')')),
    )
    .parse(input)
}

fn functional(input: &str) -> IResult<&str, (&str, Vec<Component>)> {
    pair(
        alt((
            tag_no_case("rgba"),
            tag_no_case("rgb"),
            tag_no_case("hsla"),
            tag_no_case("hsl"),
        )),
        arguments,
    )
    .parse(input)
}

fn byte_channel(c: Component) -> f64 {
    let value = match c {
        Component::Number(n) => n,
        Component::Percent(p) => p / 100.0 * 255.0,
    };
    value.round().clamp(0.0, 255.0) / 255.0
}

fn unit_channel(c: Component) -> f64 {
    let value = match c {
        Component::Number(n) => n,
        Component::Percent(p) => p / 100.0,
    };
    value.clamp(0.0, 1.0)
}

fn hue_to_rgb(m1: f64, m2: f64, mut h: f64) -> f64 {
    if h < 0.0 {
        h += 1.0;
    } else if h > 1.0 {
        h -= 1.0;
    }
    if h * 6.0 < 1.0 {
        m1 + (m2 - m1) * h * 6.0
    } else if h * 2.0 < 1.0 {
        m2
    } else if h * 3.0 < 2.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
    } else {
        m1
    }
}

fn hsl_to_color(h: f64, s: f64, l: f64, a: f64) -> Color {
    let h = (((h % 360.0) + 360.0) % 360.0) / 360.0;
    let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
    let m1 = l * 2.0 - m2;
    Color {
        r: hue_to_rgb(m1, m2, h + 1.0 / 3.0),
        g: hue_to_rgb(m1, m2, h),
        b: hue_to_rgb(m1, m2, h - 1.0 / 3.0),
        a,
    }
}

fn function_color(input: &str) -> IResult<&str, Color> {
    let (rest, (name, args)) = functional(input)?;
    let fail = || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Verify));
    let name = name.to_ascii_lowercase();
    let expected = if name.ends_with('a') { 4 } else { 3 };
    if args.len() != expected {
        return Err(fail());
    }
    let alpha = args.get(3).copied().map_or(1.0, unit_channel);
    let color = if name.starts_with("rgb") {
        Color {
            r: byte_channel(args[0]),
            g: byte_channel(args[1]),
            b: byte_channel(args[2]),
            a: alpha,
        }
    } else {
        let hue = match args[0] {
            Component::Number(h) => h,
            Component::Percent(_) => return Err(fail()),
        };
        hsl_to_color(hue, unit_channel(args[1]), unit_channel(args[2]), alpha)
    };
    Ok((rest, color))
}

fn css_color(input: &str) -> IResult<&str, Color> {
    alt((hex_color, function_color)).parse(input)
}

// --- Named Colors ---

fn named_color(name: &str) -> Option<Color> {
    let lower = name.to_ascii_lowercase();
    if lower == "transparent" {
        return Some(Color::TRANSPARENT);
    }
    NAMED_COLORS
        .binary_search_by(|(candidate, _)| candidate.cmp(&lower.as_str()))
        .ok()
        .map(|index| {
            let [r, g, b] = NAMED_COLORS[index].1;
            Color::from_rgba8(r, g, b, 1.0)
        })
}

/// Sorted by name for binary search.
static NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("aliceblue", [240, 248, 255]),
    ("antiquewhite", [250, 235, 215]),
    ("aqua", [0, 255, 255]),
    ("aquamarine", [127, 255, 212]),
    ("azure", [240, 255, 255]),
    ("beige", [245, 245, 220]),
    ("bisque", [255, 228, 196]),
    ("black", [0, 0, 0]),
    ("blanchedalmond", [255, 235, 205]),
    ("blue", [0, 0, 255]),
    ("blueviolet", [138, 43, 226]),
    ("brown", [165, 42, 42]),
    ("burlywood", [222, 184, 135]),
    ("cadetblue", [95, 158, 160]),
    ("chartreuse", [127, 255, 0]),
    ("chocolate", [210, 105, 30]),
    ("coral", [255, 127, 80]),
    ("cornflowerblue", [100, 149, 237]),
    ("cornsilk", [255, 248, 220]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkcyan", [0, 139, 139]),
    ("darkgoldenrod", [184, 134, 11]),
    ("darkgray", [169, 169, 169]),
    ("darkgreen", [0, 100, 0]),
    ("darkgrey", [169, 169, 169]),
    ("darkkhaki", [189, 183, 107]),
    ("darkmagenta", [139, 0, 139]),
    ("darkolivegreen", [85, 107, 47]),
    ("darkorange", [255, 140, 0]),
    ("darkorchid", [153, 50, 204]),
    ("darkred", [139, 0, 0]),
    ("darksalmon", [233, 150, 122]),
    ("darkseagreen", [143, 188, 143]),
    ("darkslateblue", [72, 61, 139]),
    ("darkslategray", [47, 79, 79]),
    ("darkslategrey", [47, 79, 79]),
    ("darkturquoise", [0, 206, 209]),
    ("darkviolet", [148, 0, 211]),
    ("deeppink", [255, 20, 147]),
    ("deepskyblue", [0, 191, 255]),
    ("dimgray", [105, 105, 105]),
    ("dimgrey", [105, 105, 105]),
    ("dodgerblue", [30, 144, 255]),
    ("firebrick", [178, 34, 34]),
    ("floralwhite", [255, 250, 240]),
    ("forestgreen", [34, 139, 34]),
    ("fuchsia", [255, 0, 255]),
    ("gainsboro", [220, 220, 220]),
    ("ghostwhite", [248, 248, 255]),
    ("gold", [255, 215, 0]),
    ("goldenrod", [218, 165, 32]),
    ("gray", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("greenyellow", [173, 255, 47]),
    ("grey", [128, 128, 128]),
    ("honeydew", [240, 255, 240]),
    ("hotpink", [255, 105, 180]),
    ("indianred", [205, 92, 92]),
    ("indigo", [75, 0, 130]),
    ("ivory", [255, 255, 240]),
    ("khaki", [240, 230, 140]),
    ("lavender", [230, 230, 250]),
    ("lavenderblush", [255, 240, 245]),
    ("lawngreen", [124, 252, 0]),
    ("lemonchiffon", [255, 250, 205]),
    ("lightblue", [173, 216, 230]),
    ("lightcoral", [240, 128, 128]),
    ("lightcyan", [224, 255, 255]),
    ("lightgoldenrodyellow", [250, 250, 210]),
    ("lightgray", [211, 211, 211]),
    ("lightgreen", [144, 238, 144]),
    ("lightgrey", [211, 211, 211]),
    ("lightpink", [255, 182, 193]),
    ("lightsalmon", [255, 160, 122]),
    ("lightseagreen", [32, 178, 170]),
    ("lightskyblue", [135, 206, 250]),
    ("lightslategray", [119, 136, 153]),
    ("lightslategrey", [119, 136, 153]),
    ("lightsteelblue", [176, 196, 222]),
    ("lightyellow", [255, 255, 224]),
    ("lime", [0, 255, 0]),
    ("limegreen", [50, 205, 50]),
    ("linen", [250, 240, 230]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("mediumaquamarine", [102, 205, 170]),
    ("mediumblue", [0, 0, 205]),
    ("mediumorchid", [186, 85, 211]),
    ("mediumpurple", [147, 112, 219]),
    ("mediumseagreen", [60, 179, 113]),
    ("mediumslateblue", [123, 104, 238]),
    ("mediumspringgreen", [0, 250, 154]),
    ("mediumturquoise", [72, 209, 204]),
    ("mediumvioletred", [199, 21, 133]),
    ("midnightblue", [25, 25, 112]),
    ("mintcream", [245, 255, 250]),
    ("mistyrose", [255, 228, 225]),
    ("moccasin", [255, 228, 181]),
    ("navajowhite", [255, 222, 173]),
    ("navy", [0, 0, 128]),
    ("oldlace", [253, 245, 230]),
    ("olive", [128, 128, 0]),
    ("olivedrab", [107, 142, 35]),
    ("orange", [255, 165, 0]),
    ("orangered", [255, 69, 0]),
    ("orchid", [218, 112, 214]),
    ("palegoldenrod", [238, 232, 170]),
    ("palegreen", [152, 251, 152]),
    ("paleturquoise", [175, 238, 238]),
    ("palevioletred", [219, 112, 147]),
    ("papayawhip", [255, 239, 213]),
    ("peachpuff", [255, 218, 185]),
    ("peru", [205, 133, 63]),
    ("pink", [255, 192, 203]),
    ("plum", [221, 160, 221]),
    ("powderblue", [176, 224, 230]),
    ("purple", [128, 0, 128]),
    ("rebeccapurple", [102, 51, 153]),
    ("red", [255, 0, 0]),
    ("rosybrown", [188, 143, 143]),
    ("royalblue", [65, 105, 225]),
    ("saddlebrown", [139, 69, 19]),
    ("salmon", [250, 128, 114]),
    ("sandybrown", [244, 164, 96]),
    ("seagreen", [46, 139, 87]),
    ("seashell", [255, 245, 238]),
    ("sienna", [160, 82, 45]),
    ("silver", [192, 192, 192]),
    ("skyblue", [135, 206, 235]),
    ("slateblue", [106, 90, 205]),
    ("slategray", [112, 128, 144]),
    ("slategrey", [112, 128, 144]),
    ("snow", [255, 250, 250]),
    ("springgreen", [0, 255, 127]),
    ("steelblue", [70, 130, 180]),
    ("tan", [210, 180, 140]),
    ("teal", [0, 128, 128]),
    ("thistle", [216, 191, 216]),
    ("tomato", [255, 99, 71]),
    ("turquoise", [64, 224, 208]),
    ("violet", [238, 130, 238]),
    ("wheat", [245, 222, 179]),
    ("white", [255, 255, 255]),
    ("whitesmoke", [245, 245, 245]),
    ("yellow", [255, 255, 0]),
    ("yellowgreen", [154, 205, 50]),
];
