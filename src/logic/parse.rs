use crate::logic::errors::ParseError;
use crate::model::{Selection, SelectionTree};

/// Recursive-descent parser for the `fields` syntax:
///
/// ```text
/// selection  := field (',' field)*
/// field      := identifier ['(' selection ')']
/// identifier := [A-Za-z_]+
/// ```
pub struct SelectionParser;

impl SelectionParser {
    /// Deepest group nesting accepted, counted in '(' levels
    pub const MAX_NESTING: usize = 64;

    /// Parse a raw `fields` value into a selection tree.
    ///
    /// Leading and trailing whitespace is ignored; whitespace anywhere else is
    /// an invalid character.
    pub fn parse(raw: &str) -> Result<SelectionTree, ParseError> {
        let input: Vec<char> = raw.trim().chars().collect();

        // Balance and nesting are checked up front, without recursion, so that
        // any unbalanced input reports UnmatchedOpen/UnmatchedClose regardless
        // of what else is wrong with it and `parse_span` never nests too deep.
        Self::check_balance(&input)?;

        Self::parse_span(&input, 0, input.len())
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn check_balance(input: &[char]) -> Result<(), ParseError> {
        let mut open = Vec::new();
        let mut too_deep = None;
        for (position, c) in input.iter().enumerate() {
            match c {
                '(' => {
                    open.push(position);
                    if open.len() > Self::MAX_NESTING && too_deep.is_none() {
                        too_deep = Some(position);
                    }
                }
                ')' => {
                    if open.pop().is_none() {
                        return Err(ParseError::UnmatchedClose { position });
                    }
                }
                _ => {}
            }
        }
        if let Some(&position) = open.first() {
            return Err(ParseError::UnmatchedOpen { position });
        }
        match too_deep {
            Some(position) => Err(ParseError::NestingTooDeep {
                position,
                limit: Self::MAX_NESTING,
            }),
            None => Ok(()),
        }
    }

    /// Index of the ')' closing the '(' at `open`, searching no further than `end`
    fn matching_close(input: &[char], open: usize, end: usize) -> Result<usize, ParseError> {
        let mut depth = 0usize;
        for (position, c) in input.iter().enumerate().take(end).skip(open + 1) {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => return Ok(position),
                ')' => depth -= 1,
                _ => {}
            }
        }
        Err(ParseError::UnmatchedOpen { position: open })
    }

    /// Parse `input[start..end]` as a selection
    fn parse_span(input: &[char], start: usize, end: usize) -> Result<SelectionTree, ParseError> {
        let mut tree = SelectionTree::new();
        let mut name = String::new();
        let mut just_closed = false;
        let mut cursor = start;

        while cursor < end {
            let c = input[cursor];
            match c {
                ',' => {
                    if just_closed {
                        // separator after a group; the group already recorded its field
                        just_closed = false;
                    } else if name.is_empty() {
                        return Err(ParseError::LeadingSeparator { position: cursor });
                    } else {
                        tree.insert(std::mem::take(&mut name), Selection::Leaf);
                    }
                }
                '(' => {
                    if just_closed {
                        return Err(ParseError::MalformedGroup { position: cursor });
                    }
                    let close = Self::matching_close(input, cursor, end)?;
                    if close == cursor + 1 {
                        return Err(ParseError::EmptyGroup { position: close });
                    }
                    if name.is_empty() {
                        return Err(ParseError::MalformedGroup { position: cursor });
                    }

                    let nested = Self::parse_span(input, cursor + 1, close)?;
                    tree.insert(std::mem::take(&mut name), Selection::Nested(nested));

                    cursor = close + 1;
                    just_closed = true;
                    continue;
                }
                ')' => return Err(ParseError::UnmatchedClose { position: cursor }),
                c if Self::is_identifier_char(c) => {
                    if just_closed {
                        return Err(ParseError::MalformedGroup { position: cursor });
                    }
                    name.push(c);
                }
                character => {
                    return Err(ParseError::InvalidCharacter {
                        character,
                        position: cursor,
                    })
                }
            }
            cursor += 1;
        }

        if !name.is_empty() {
            tree.insert(name, Selection::Leaf);
        } else if !just_closed {
            // empty input or a trailing ','
            return Err(ParseError::EmptyField { position: end });
        }

        Ok(tree)
    }
}
