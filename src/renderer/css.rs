//! CSS parser and stylesheet representation using cssparser
//!
//! Parsing never fails: malformed rules are dropped up to the end of their
//! block and malformed declarations up to the next `;`.

use super::selector::Selector;
use cssparser::{BasicParseErrorKind, Delimiter, ParseError, Parser, ParserInput, Token};

/// Priority added to declarations marked `!important`
pub const IMPORTANT_PRIORITY: u32 = 10000;

/// CSS length
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f32),
    Em(f32),
    Percent(f32),
}

impl Length {
    /// Parse `12px`, `1.5em`, `80%` or a bare `0`
    pub fn parse(text: &str) -> Option<Self> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let length = match parser.next().ok()?.clone() {
            Token::Dimension { value, unit, .. } => match unit.to_ascii_lowercase().as_str() {
                "px" => Length::Px(value),
                "em" | "rem" => Length::Em(value),
                "pt" => Length::Px(value * 4.0 / 3.0),
                _ => return None,
            },
            Token::Percentage { unit_value, .. } => Length::Percent(unit_value * 100.0),
            Token::Number { value, .. } if value == 0.0 => Length::Px(0.0),
            _ => return None,
        };
        parser.is_exhausted().then_some(length)
    }

    /// Resolve to pixels against a reference size (percent and em base)
    pub fn to_px(self, reference: f32) -> f32 {
        match self {
            Length::Px(px) => px,
            Length::Em(em) => em * reference,
            Length::Percent(pct) => pct / 100.0 * reference,
        }
    }
}

/// CSS color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a color value: name, `#hex`, `rgb()` or `rgba()`
    pub fn parse(text: &str) -> Option<Self> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let color = match parser.next().ok()?.clone() {
            Token::Ident(name) => Self::from_name(&name)?,
            Token::IDHash(hash) | Token::Hash(hash) => Self::from_hex(&hash)?,
            Token::Function(name) if name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba") => {
                let has_alpha = name.eq_ignore_ascii_case("rgba");
                parser
                    .parse_nested_block(|p| parse_rgb_function(p, has_alpha))
                    .ok()?
            }
            _ => return None,
        };
        parser.is_exhausted().then_some(color)
    }

    /// Parse with a fallback for unparseable values
    pub fn parse_or(text: &str, fallback: Color) -> Self {
        Self::parse(text).unwrap_or_else(|| {
            log::trace!("unparseable color {text:?}");
            fallback
        })
    }

    /// Whether the color paints nothing
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Parse a hex color string
    fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
                Some(Color::rgb(r, g, b))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Color::rgb(r, g, b))
            }
            8 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
                Some(Color::rgba(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Parse named colors
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "black" => Some(Color::rgb(0, 0, 0)),
            "white" => Some(Color::rgb(255, 255, 255)),
            "red" => Some(Color::rgb(255, 0, 0)),
            "green" => Some(Color::rgb(0, 128, 0)),
            "lime" => Some(Color::rgb(0, 255, 0)),
            "blue" => Some(Color::rgb(0, 0, 255)),
            "navy" => Some(Color::rgb(0, 0, 128)),
            "yellow" => Some(Color::rgb(255, 255, 0)),
            "cyan" | "aqua" => Some(Color::rgb(0, 255, 255)),
            "magenta" | "fuchsia" => Some(Color::rgb(255, 0, 255)),
            "gray" | "grey" => Some(Color::rgb(128, 128, 128)),
            "lightgray" | "lightgrey" => Some(Color::rgb(211, 211, 211)),
            "darkgray" | "darkgrey" => Some(Color::rgb(169, 169, 169)),
            "silver" => Some(Color::rgb(192, 192, 192)),
            "orange" => Some(Color::rgb(255, 165, 0)),
            "purple" => Some(Color::rgb(128, 0, 128)),
            "pink" => Some(Color::rgb(255, 192, 203)),
            "brown" => Some(Color::rgb(165, 42, 42)),
            "lightblue" => Some(Color::rgb(173, 216, 230)),
            "lightgreen" => Some(Color::rgb(144, 238, 144)),
            "transparent" => Some(Color::rgba(0, 0, 0, 0)),
            _ => None,
        }
    }
}

/// Parse rgb() or rgba() arguments
fn parse_rgb_function<'i>(
    parser: &mut Parser<'i, '_>,
    has_alpha: bool,
) -> Result<Color, ParseError<'i, ()>> {
    let r = parse_color_component(parser)?;
    let _ = parser.try_parse(|p| p.expect_comma());
    let g = parse_color_component(parser)?;
    let _ = parser.try_parse(|p| p.expect_comma());
    let b = parse_color_component(parser)?;

    let a = if has_alpha {
        let _ = parser.try_parse(|p| p.expect_comma());
        parse_alpha_component(parser)?
    } else {
        255
    };
    parser.expect_exhausted()?;

    Ok(Color::rgba(r, g, b, a))
}

/// Parse a color component (0-255 or percentage)
fn parse_color_component<'i>(parser: &mut Parser<'i, '_>) -> Result<u8, ParseError<'i, ()>> {
    let token = parser.next()?.clone();
    match token {
        Token::Number { value, .. } => Ok(value.clamp(0.0, 255.0) as u8),
        Token::Percentage { unit_value, .. } => Ok((unit_value * 255.0).clamp(0.0, 255.0) as u8),
        _ => Err(parser.new_error(BasicParseErrorKind::UnexpectedToken(token))),
    }
}

/// Parse alpha component (0-1 or percentage)
fn parse_alpha_component<'i>(parser: &mut Parser<'i, '_>) -> Result<u8, ParseError<'i, ()>> {
    let token = parser.next()?.clone();
    match token {
        Token::Number { value, .. } => Ok((value.clamp(0.0, 1.0) * 255.0) as u8),
        Token::Percentage { unit_value, .. } => Ok((unit_value * 255.0).clamp(0.0, 255.0) as u8),
        _ => Err(parser.new_error(BasicParseErrorKind::UnexpectedToken(token))),
    }
}

/// CSS declaration (property: value)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercase property name
    pub property: String,
    /// Source text of the value, trimmed
    pub value: String,
    pub important: bool,
}

/// CSS rule (selector + declarations)
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
    /// Selector specificity, plus [`IMPORTANT_PRIORITY`] for the
    /// `!important` half of a rule
    pub priority: u32,
}

/// CSS stylesheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Append another sheet's rules after this one's
    pub fn extend(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
    }
}

/// CSS parser using cssparser crate
pub struct CssParser {}

impl CssParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Parse CSS content into a stylesheet
    pub fn parse(&self, content: &str) -> Stylesheet {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();

        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }

            let selectors = parser.parse_until_before(Delimiter::CurlyBracketBlock, |p| {
                p.parse_comma_separated(|p| self.parse_compounds(p, true))
            });
            if parser.expect_curly_bracket_block().is_err() {
                log::debug!("dropping unterminated rule at end of stylesheet");
                break;
            }
            let selectors = match selectors {
                Ok(selectors) => selectors,
                Err(err) => {
                    // The unread block is skipped by the next token fetch
                    log::debug!("dropping rule with bad selector at {:?}", err.location);
                    continue;
                }
            };
            let declarations = parser
                .parse_nested_block(|p| Ok::<_, ParseError<'_, ()>>(self.parse_declaration_list(p)))
                .unwrap_or_default();

            let (important, normal): (Vec<_>, Vec<_>) =
                declarations.into_iter().partition(|d| d.important);
            for compounds in selectors {
                let selector = Selector::from_compounds(compounds);
                let specificity = selector.specificity();
                if !normal.is_empty() {
                    rules.push(Rule {
                        selector: selector.clone(),
                        declarations: normal.clone(),
                        priority: specificity,
                    });
                }
                if !important.is_empty() {
                    rules.push(Rule {
                        selector,
                        declarations: important.clone(),
                        priority: specificity + IMPORTANT_PRIORITY,
                    });
                }
            }
        }

        Stylesheet { rules }
    }

    /// Parse the body of an inline `style` attribute
    pub fn parse_declarations(&self, content: &str) -> Vec<Declaration> {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        self.parse_declaration_list(&mut parser)
    }

    /// Parse a single selector (no commas)
    pub fn parse_selector(&self, content: &str) -> Option<Selector> {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        let compounds = self.parse_compounds(&mut parser, true).ok()?;
        parser.is_exhausted().then(|| Selector::from_compounds(compounds))
    }

    /// Space-separated compound selectors, outermost first
    fn parse_compounds<'i>(
        &self,
        parser: &mut Parser<'i, '_>,
        allow_has: bool,
    ) -> Result<Vec<Selector>, ParseError<'i, ()>> {
        let mut compounds = Vec::new();
        let mut current: Vec<Selector> = Vec::new();

        while let Ok(token) = parser.next_including_whitespace() {
            match token.clone() {
                Token::WhiteSpace(_) => flush_compound(&mut current, &mut compounds),
                Token::Ident(name) if current.is_empty() => {
                    current.push(Selector::Tag(name.to_ascii_lowercase()));
                }
                Token::Delim('.') => match parser.next_including_whitespace()?.clone() {
                    Token::Ident(name) => current.push(Selector::Class(name.to_string())),
                    other => return Err(parser.new_unexpected_token_error(other)),
                },
                Token::IDHash(name) | Token::Hash(name) => current.push(Selector::Id(name.to_string())),
                Token::Colon => match parser.next_including_whitespace()?.clone() {
                    Token::Function(name) if name.eq_ignore_ascii_case("has") && allow_has && !current.is_empty() => {
                        let chain = parser.parse_nested_block(|p| {
                            p.skip_whitespace();
                            self.parse_compounds(p, false)
                        })?;
                        let subject = compound(std::mem::take(&mut current));
                        current.push(Selector::has(subject, chain));
                    }
                    other => return Err(parser.new_unexpected_token_error(other)),
                },
                other => return Err(parser.new_unexpected_token_error(other)),
            }
        }
        flush_compound(&mut current, &mut compounds);

        if compounds.is_empty() {
            return Err(parser.new_error(BasicParseErrorKind::EndOfInput));
        }
        Ok(compounds)
    }

    /// Parse `property: value [!important]` pairs separated by `;`
    fn parse_declaration_list(&self, parser: &mut Parser<'_, '_>) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }
            match parser.parse_until_after(Delimiter::Semicolon, |p| self.parse_declaration(p)) {
                Ok(declaration) => declarations.push(declaration),
                Err(err) => log::debug!("dropping malformed declaration at {:?}", err.location),
            }
        }
        declarations
    }

    fn parse_declaration<'i>(&self, parser: &mut Parser<'i, '_>) -> Result<Declaration, ParseError<'i, ()>> {
        let property = parser.expect_ident()?.to_ascii_lowercase();
        parser.expect_colon()?;
        let value = parser.parse_until_before(Delimiter::Bang, |p| {
            let start = p.position();
            while p.next().is_ok() {}
            Ok::<_, ParseError<'i, ()>>(p.slice_from(start).trim().to_string())
        })?;
        let important = parser
            .try_parse(|p| -> Result<(), ParseError<'i, ()>> {
                p.expect_delim('!')?;
                p.expect_ident_matching("important")?;
                Ok(())
            })
            .is_ok();
        parser.expect_exhausted()?;
        if value.is_empty() {
            return Err(parser.new_error(BasicParseErrorKind::EndOfInput));
        }
        Ok(Declaration {
            property,
            value,
            important,
        })
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

fn compound(mut parts: Vec<Selector>) -> Selector {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        Selector::Sequence(parts)
    }
}

fn flush_compound(current: &mut Vec<Selector>, compounds: &mut Vec<Selector>) {
    if !current.is_empty() {
        compounds.push(compound(std::mem::take(current)));
    }
}
