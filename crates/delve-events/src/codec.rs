//! Text encoding of the values that appear in save files.
//!
//! Integers are decimal with an optional leading `-` and are overflow
//! checked. Seeds are exactly eight lowercase hex digits; ids and
//! initiatives are exactly 64. Enumerations use their stable snake_case
//! tokens. Every parser reports problems as a [`Diagnostic`] pointing at the
//! offending token (or the offending character inside it).

use core::fmt::Write as _;

use delve_types::{
    AbilityId, Action, BookKind, Coord, DecisionMakerType, ParseUint256Error, PotionKind,
    SpeciesId, ThingId, ThingSignature, ThingType, Uint256, WandKind, WeaponKind,
};

use crate::error::Diagnostic;
use crate::token::{Line, Token};

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Parse a signed decimal integer.
///
/// # Errors
///
/// `expected decimal digits` for anything but an optional `-` followed by
/// digits; `integer overflow` if it does not fit in `i64`.
pub fn parse_i64(token: &Token) -> Result<i64, Diagnostic> {
    let text = token.text.as_str();
    let (negative, digits) = text
        .strip_prefix('-')
        .map_or((false, text), |rest| (true, rest));
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(token.error("expected decimal digits"));
    }
    let mut value: i64 = 0;
    for byte in digits.bytes() {
        let digit = i64::from(byte.wrapping_sub(b'0'));
        let digit = if negative { digit.wrapping_neg() } else { digit };
        value = value
            .checked_mul(10)
            .and_then(|value| value.checked_add(digit))
            .ok_or_else(|| token.error("integer overflow"))?;
    }
    Ok(value)
}

/// Parse a decimal integer that must fit in an `i32`.
///
/// # Errors
///
/// As [`parse_i64`], with `integer overflow` outside the `i32` range.
pub fn parse_i32(token: &Token) -> Result<i32, Diagnostic> {
    i32::try_from(parse_i64(token)?)
        .ok()
        .ok_or_else(|| token.error("integer overflow"))
}

/// Parse a non-negative decimal integer that must fit in a `u64`.
///
/// # Errors
///
/// As [`parse_i64`], with `integer overflow` for negative values.
pub fn parse_u64(token: &Token) -> Result<u64, Diagnostic> {
    u64::try_from(parse_i64(token)?)
        .ok()
        .ok_or_else(|| token.error("integer overflow"))
}

/// Parse a non-negative index or count.
///
/// # Errors
///
/// As [`parse_u64`].
pub fn parse_usize(token: &Token) -> Result<usize, Diagnostic> {
    usize::try_from(parse_u64(token)?)
        .ok()
        .ok_or_else(|| token.error("integer overflow"))
}

/// Parse a `0`/`1` flag.
///
/// # Errors
///
/// `expected 0 or 1` for anything else.
pub fn parse_flag(token: &Token) -> Result<bool, Diagnostic> {
    match token.text.as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(token.error("expected 0 or 1")),
    }
}

/// Encode a flag as `0`/`1`.
pub const fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn hex_digit_error(token: &Token, index: usize) -> Diagnostic {
    Diagnostic::new(
        token.column.saturating_add(index),
        "hex digit out of range [0-9a-f]",
    )
}

/// Parse exactly eight lowercase hex digits.
///
/// # Errors
///
/// `expected hex uint32` for the wrong length, or a located bad-digit error.
pub fn parse_hex_u32(token: &Token) -> Result<u32, Diagnostic> {
    if token.text.len() != 8 {
        return Err(token.error("expected hex uint32"));
    }
    let mut value: u32 = 0;
    for (index, byte) in token.text.bytes().enumerate() {
        let nibble = match byte {
            b'0'..=b'9' => byte.wrapping_sub(b'0'),
            b'a'..=b'f' => byte.wrapping_sub(b'a').wrapping_add(10),
            _ => return Err(hex_digit_error(token, index)),
        };
        value = (value << 4) | u32::from(nibble);
    }
    Ok(value)
}

/// Encode a seed as eight lowercase hex digits.
pub fn hex_u32(value: u32) -> String {
    format!("{value:08x}")
}

/// Parse a 64-digit hex value.
///
/// # Errors
///
/// `expected hex uint256` for the wrong length, or a located bad-digit error.
pub fn parse_uint256(token: &Token) -> Result<Uint256, Diagnostic> {
    token.text.parse().map_err(|error| match error {
        ParseUint256Error::WrongLength { .. } => token.error("expected hex uint256"),
        ParseUint256Error::BadDigit { index } => hex_digit_error(token, index),
    })
}

/// Parse a thing id.
///
/// # Errors
///
/// As [`parse_uint256`].
pub fn parse_thing_id(token: &Token) -> Result<ThingId, Diagnostic> {
    parse_uint256(token).map(ThingId)
}

/// Parse an optional thing id, where all zeroes means none.
///
/// # Errors
///
/// As [`parse_uint256`].
pub fn parse_optional_id(token: &Token) -> Result<Option<ThingId>, Diagnostic> {
    let value = parse_uint256(token)?;
    Ok((!value.is_zero()).then_some(ThingId(value)))
}

/// Encode an optional thing id, writing all zeroes for none.
pub fn optional_id(id: Option<ThingId>) -> String {
    id.map_or(Uint256::ZERO, ThingId::into_inner).to_string()
}

/// Parse a quoted string, resolving `\"` and `\\`.
///
/// # Errors
///
/// `expected quoted string` if the token is not quoted.
pub fn parse_quoted(token: &Token) -> Result<String, Diagnostic> {
    let inner = token
        .text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| token.error("expected quoted string"))?;
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
        } else {
            text.push(c);
        }
    }
    Ok(text)
}

/// Quote a string for the save file.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len().saturating_add(2));
    quoted.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Parse an enumeration token.
///
/// # Errors
///
/// `undefined <what>` if the token names no variant.
pub fn parse_named<T>(
    token: &Token,
    from_name: fn(&str) -> Option<T>,
    what: &str,
) -> Result<T, Diagnostic> {
    from_name(&token.text).ok_or_else(|| token.error(format!("undefined {what}")))
}

/// Parse an `x y` pair.
///
/// # Errors
///
/// As [`parse_i32`].
pub fn parse_coord(x: &Token, y: &Token) -> Result<Coord, Diagnostic> {
    Ok(Coord::new(parse_i32(x)?, parse_i32(y)?))
}

// ---------------------------------------------------------------------------
// Thing signatures
// ---------------------------------------------------------------------------

fn parse_item_kind<T>(
    token: &Token,
    from_name: fn(&str) -> Option<T>,
    what: &str,
) -> Result<Option<T>, Diagnostic> {
    if token.text == "unknown" {
        Ok(None)
    } else {
        parse_named(token, from_name, what).map(Some)
    }
}

/// Parse a `<type> <name>` pair such as `wand digging` or `potion unknown`.
///
/// # Errors
///
/// `undefined thing type` or `undefined <kind> id` for unknown tokens.
pub fn parse_signature(type_token: &Token, name: &Token) -> Result<ThingSignature, Diagnostic> {
    let thing_type = parse_named(type_token, ThingType::from_name, "thing type")?;
    Ok(match thing_type {
        ThingType::Individual => {
            ThingSignature::Individual(parse_named(name, SpeciesId::from_name, "species id")?)
        }
        ThingType::Wand => ThingSignature::Wand(parse_item_kind(name, WandKind::from_name, "wand id")?),
        ThingType::Potion => {
            ThingSignature::Potion(parse_item_kind(name, PotionKind::from_name, "potion id")?)
        }
        ThingType::Book => ThingSignature::Book(parse_item_kind(name, BookKind::from_name, "book id")?),
        ThingType::Weapon => {
            ThingSignature::Weapon(parse_named(name, WeaponKind::from_name, "weapon id")?)
        }
    })
}

/// Encode a signature as `<type> <name>`.
pub fn signature(signature: ThingSignature) -> String {
    format!("{} {}", signature.thing_type(), signature.kind_name())
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Encode an action as one save-file line (without the newline).
pub fn format_action(action: &Action) -> String {
    let mut line = action.name().to_owned();
    // Writing to a String cannot fail.
    let _ = match *action {
        Action::Move(d) | Action::Attack(d) => write!(line, " {} {}", d.x, d.y),
        Action::Zap { item, direction }
        | Action::ReadBook { item, direction }
        | Action::Throw { item, direction } => {
            write!(line, " {item} {} {}", direction.x, direction.y)
        }
        Action::PickUp(item) | Action::Drop(item) | Action::Quaff(item) | Action::CheatKill(item) => {
            write!(line, " {item}")
        }
        Action::Ability { ability, direction } => {
            write!(line, " {ability} {} {}", direction.x, direction.y)
        }
        Action::CheatPolymorph(species) => write!(line, " {species}"),
        Action::CheatGenerateMonster {
            species,
            decision_maker,
            location,
        } => write!(
            line,
            " {species} {decision_maker} {} {}",
            location.x, location.y
        ),
        Action::CheatWish(wished) => write!(line, " {}", signature(wished)),
        Action::Wait
        | Action::GoDown
        | Action::CheatHealth
        | Action::CheatIdentify
        | Action::CheatGoDown
        | Action::CheatGainLevel => Ok(()),
    };
    line
}

/// Whether a keyword names an action.
pub fn is_action_name(keyword: &str) -> bool {
    matches!(
        keyword,
        "move"
            | "wait"
            | "attack"
            | "zap"
            | "pickup"
            | "drop"
            | "quaff"
            | "read_book"
            | "throw"
            | "down"
            | "ability"
            | "!health"
            | "!kill"
            | "!polymorph"
            | "!monster"
            | "!wish"
            | "!identify"
            | "!down"
            | "!levelup"
    )
}

fn item_and_direction(line: &Line) -> Result<(ThingId, Coord), Diagnostic> {
    match line.expect_args(3)? {
        [item, x, y] => Ok((parse_thing_id(item)?, parse_coord(x, y)?)),
        _ => Err(Diagnostic::line("expected 3 arguments")),
    }
}

fn single<'a>(line: &'a Line) -> Result<&'a Token, Diagnostic> {
    match line.expect_args(1)? {
        [token] => Ok(token),
        _ => Err(Diagnostic::line("expected 1 arguments")),
    }
}

fn direction(line: &Line) -> Result<Coord, Diagnostic> {
    match line.expect_args(2)? {
        [x, y] => parse_coord(x, y),
        _ => Err(Diagnostic::line("expected 2 arguments")),
    }
}

/// Decode an action line.
///
/// # Errors
///
/// `undefined action name` for an unknown keyword, argument count errors,
/// or a malformed argument.
pub fn parse_action(line: &Line) -> Result<Action, Diagnostic> {
    let action = match line.keyword() {
        "move" => Action::Move(direction(line)?),
        "attack" => Action::Attack(direction(line)?),
        "wait" => {
            line.expect_args(0)?;
            Action::Wait
        }
        "zap" => {
            let (item, direction) = item_and_direction(line)?;
            Action::Zap { item, direction }
        }
        "read_book" => {
            let (item, direction) = item_and_direction(line)?;
            Action::ReadBook { item, direction }
        }
        "throw" => {
            let (item, direction) = item_and_direction(line)?;
            Action::Throw { item, direction }
        }
        "pickup" => Action::PickUp(parse_thing_id(single(line)?)?),
        "drop" => Action::Drop(parse_thing_id(single(line)?)?),
        "quaff" => Action::Quaff(parse_thing_id(single(line)?)?),
        "!kill" => Action::CheatKill(parse_thing_id(single(line)?)?),
        "ability" => match line.expect_args(3)? {
            [ability, x, y] => Action::Ability {
                ability: parse_named(ability, AbilityId::from_name, "ability id")?,
                direction: parse_coord(x, y)?,
            },
            _ => return Err(Diagnostic::line("expected 3 arguments")),
        },
        "!polymorph" => Action::CheatPolymorph(parse_named(
            single(line)?,
            SpeciesId::from_name,
            "species id",
        )?),
        "!monster" => match line.expect_args(4)? {
            [species, decision_maker, x, y] => Action::CheatGenerateMonster {
                species: parse_named(species, SpeciesId::from_name, "species id")?,
                decision_maker: parse_named(
                    decision_maker,
                    DecisionMakerType::from_name,
                    "decision maker",
                )?,
                location: parse_coord(x, y)?,
            },
            _ => return Err(Diagnostic::line("expected 4 arguments")),
        },
        "!wish" => match line.expect_args(2)? {
            [thing_type, name] => Action::CheatWish(parse_signature(thing_type, name)?),
            _ => return Err(Diagnostic::line("expected 2 arguments")),
        },
        "down" | "!health" | "!identify" | "!down" | "!levelup" => {
            line.expect_args(0)?;
            match line.keyword() {
                "down" => Action::GoDown,
                "!health" => Action::CheatHealth,
                "!identify" => Action::CheatIdentify,
                "!down" => Action::CheatGoDown,
                _ => Action::CheatGainLevel,
            }
        }
        _ => return Err(Diagnostic::line("undefined action name")),
    };
    Ok(action)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    fn token(text: &str) -> Token {
        Token {
            text: text.to_owned(),
            column: 5,
        }
    }

    fn line(text: &str) -> Line {
        Line {
            number: 1,
            tokens: tokenize(text).unwrap(),
        }
    }

    #[test]
    fn decimal_parsing_checks_digits_and_overflow() {
        assert_eq!(parse_i32(&token("-12")).unwrap(), -12);
        assert_eq!(
            parse_i32(&token("1x")).unwrap_err().message,
            "expected decimal digits"
        );
        assert_eq!(parse_i32(&token("-")).unwrap_err().message, "expected decimal digits");
        assert_eq!(
            parse_i32(&token("2147483648")).unwrap_err().message,
            "integer overflow"
        );
        assert_eq!(
            parse_i64(&token("99999999999999999999")).unwrap_err().message,
            "integer overflow"
        );
        assert_eq!(parse_i64(&token("-9223372036854775808")).unwrap(), i64::MIN);
        assert_eq!(parse_u64(&token("-1")).unwrap_err().message, "integer overflow");
        assert_eq!(parse_usize(&token("42")).unwrap(), 42);
    }

    #[test]
    fn hex_seed_parsing() {
        assert_eq!(parse_hex_u32(&token("0000001f")).unwrap(), 31);
        assert_eq!(hex_u32(31), "0000001f");
        assert_eq!(parse_hex_u32(&token("1f")).unwrap_err().message, "expected hex uint32");
        let bad = parse_hex_u32(&token("000000G0")).unwrap_err();
        assert_eq!(bad.column, 11);
        assert_eq!(bad.message, "hex digit out of range [0-9a-f]");
    }

    #[test]
    fn quoting_escapes_quotes_and_backslashes() {
        let text = r#"a "b" \ c"#;
        let quoted = quote(text);
        assert_eq!(parse_quoted(&token(&quoted)).unwrap(), text);
        assert_eq!(
            parse_quoted(&token("bare")).unwrap_err().message,
            "expected quoted string"
        );
    }

    #[test]
    fn actions_decode_what_they_encode() {
        let item = ThingId::from_u64(7);
        let actions = [
            Action::Move(Coord::new(-1, 0)),
            Action::Wait,
            Action::Zap {
                item,
                direction: Coord::new(0, 1),
            },
            Action::Quaff(item),
            Action::Ability {
                ability: AbilityId::ThrowTar,
                direction: Coord::new(1, 1),
            },
            Action::CheatGenerateMonster {
                species: SpeciesId::Ogre,
                decision_maker: DecisionMakerType::Ai,
                location: Coord::new(3, 4),
            },
            Action::CheatWish(ThingSignature::Potion(None)),
            Action::CheatGainLevel,
        ];
        for action in actions {
            let text = format_action(&action);
            assert!(is_action_name(line(&text).keyword()));
            assert_eq!(parse_action(&line(&text)).unwrap(), action, "{text}");
        }
    }

    #[test]
    fn action_errors_are_specific() {
        assert_eq!(
            parse_action(&line("dance")).unwrap_err().message,
            "undefined action name"
        );
        assert_eq!(
            parse_action(&line("wait 1")).unwrap_err().message,
            "expected 0 arguments. got 1 arguments."
        );
        let error = parse_action(&line("!polymorph dragon")).unwrap_err();
        assert_eq!((error.column, error.message.as_str()), (12, "undefined species id"));
    }

    #[test]
    fn signatures_accept_unknown_items_only() {
        assert_eq!(
            parse_signature(&token("wand"), &token("unknown")).unwrap(),
            ThingSignature::Wand(None)
        );
        assert_eq!(
            parse_signature(&token("individual"), &token("unknown"))
                .unwrap_err()
                .message,
            "undefined species id"
        );
        assert_eq!(
            signature(ThingSignature::Book(Some(BookKind::MagicBullet))),
            "book magic_bullet"
        );
    }
}
