//! Display templates for foreign-key columns.
//!
//! Templates use positional placeholders: `{0}` names the first display value,
//! `{}` takes the next one in sequence, and `{{`/`}}` produce literal braces.

use crate::{CellValue, GridError, GridResult};

#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Literal(&'a str),
    Brace(char),
    Slot(usize),
}

fn parse(template: &str) -> GridResult<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut next_auto = 0usize;
    let mut literal_start = 0usize;
    let mut chars = template.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '{' | '}' if chars.peek().map(|(_, c)| *c) == Some(ch) => {
                if literal_start < idx {
                    pieces.push(Piece::Literal(&template[literal_start..idx]));
                }
                pieces.push(Piece::Brace(ch));
                chars.next();
                literal_start = idx + 2;
            }
            '{' => {
                if literal_start < idx {
                    pieces.push(Piece::Literal(&template[literal_start..idx]));
                }
                let rest = &template[idx + 1..];
                let close = rest.find('}').ok_or_else(|| {
                    GridError::contract(format!("unterminated placeholder in '{template}'"))
                })?;
                let name = &rest[..close];
                let slot = if name.is_empty() {
                    let slot = next_auto;
                    next_auto += 1;
                    slot
                } else {
                    name.parse::<usize>().map_err(|_| {
                        GridError::contract(format!(
                            "unsupported placeholder '{{{name}}}' in '{template}'"
                        ))
                    })?
                };
                pieces.push(Piece::Slot(slot));
                for _ in 0..=close {
                    chars.next();
                }
                literal_start = idx + close + 2;
            }
            '}' => {
                return Err(GridError::contract(format!(
                    "unmatched '}}' in '{template}'"
                )));
            }
            _ => {}
        }
    }
    if literal_start < template.len() {
        pieces.push(Piece::Literal(&template[literal_start..]));
    }
    Ok(pieces)
}

/// Check that every placeholder in `template` refers to one of `available` values.
pub fn validate_template(template: &str, available: usize) -> GridResult<()> {
    for piece in parse(template)? {
        if let Piece::Slot(slot) = piece {
            if slot >= available {
                return Err(GridError::contract(format!(
                    "placeholder {{{slot}}} in '{template}' exceeds {available} display values"
                )));
            }
        }
    }
    Ok(())
}

pub fn format_display(template: &str, values: &[CellValue]) -> GridResult<String> {
    let mut out = String::new();
    for piece in parse(template)? {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Brace(ch) => out.push(ch),
            Piece::Slot(slot) => {
                let value = values.get(slot).ok_or_else(|| {
                    GridError::contract(format!(
                        "placeholder {{{slot}}} in '{template}' has no display value"
                    ))
                })?;
                out.push_str(&value.render());
            }
        }
    }
    Ok(out)
}
