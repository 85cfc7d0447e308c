use thiserror::Error;

/// Errors raised while parsing a `fields` parameter.
///
/// Positions are character offsets into the trimmed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Fields parameter cannot take empty object () (position {position}).")]
    EmptyGroup { position: usize },

    #[error("Fields parameter has a ')' without a matching '(' (position {position}).")]
    UnmatchedClose { position: usize },

    #[error("Fields parameter must take entire pair of '()' (position {position}).")]
    UnmatchedOpen { position: usize },

    #[error("Fields parameter cannot start with a ',' (position {position}).")]
    LeadingSeparator { position: usize },

    #[error("Fields parameter cannot contain character '{character}' (position {position}).")]
    InvalidCharacter { character: char, position: usize },

    #[error("Fields parameter format error (position {position}).")]
    MalformedGroup { position: usize },

    #[error("Fields parameter cannot end with an empty field (position {position}).")]
    EmptyField { position: usize },

    #[error("Fields parameter nests deeper than {limit} levels (position {position}).")]
    NestingTooDeep { position: usize, limit: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::EmptyGroup { position }
            | ParseError::UnmatchedClose { position }
            | ParseError::UnmatchedOpen { position }
            | ParseError::LeadingSeparator { position }
            | ParseError::InvalidCharacter { position, .. }
            | ParseError::MalformedGroup { position }
            | ParseError::EmptyField { position }
            | ParseError::NestingTooDeep { position, .. } => *position,
        }
    }
}

/// Failures reported by an entity store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("query on '{entity}' failed: {message}")]
    Query { entity: String, message: String },

    #[error("could not decode '{entity}' row: {message}")]
    Decode { entity: String, message: String },
}

/// Errors raised while reducing an entity graph against a selection tree
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("{entity} doesn't have {field}")]
    UnknownField { entity: String, field: String },

    #[error("fetching related entities failed: {0}")]
    FetchFailed(#[from] StoreError),

    #[error("response shape conflict: {0}")]
    InternalShapeConflict(String),

    #[error("element {index}: {source}")]
    AtIndex {
        index: usize,
        #[source]
        source: Box<ReduceError>,
    },
}

impl ReduceError {
    /// The innermost error, skipping collection index wrappers
    pub fn root_cause(&self) -> &ReduceError {
        match self {
            ReduceError::AtIndex { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Index of the failing element in the outermost collection, if any
    pub fn failing_index(&self) -> Option<usize> {
        match self {
            ReduceError::AtIndex { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Errors from the request and response pipeline stages
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_indices() {
        let err = ReduceError::AtIndex {
            index: 2,
            source: Box::new(ReduceError::AtIndex {
                index: 0,
                source: Box::new(ReduceError::FetchFailed(StoreError::Query {
                    entity: "Order".to_string(),
                    message: "connection reset".to_string(),
                })),
            }),
        };

        assert_eq!(err.failing_index(), Some(2));
        assert!(matches!(err.root_cause(), ReduceError::FetchFailed(_)));
        assert_eq!(
            err.to_string(),
            "element 2: element 0: fetching related entities failed: query on 'Order' failed: connection reset"
        );
    }

    #[test]
    fn test_parse_error_messages() {
        let err = ParseError::InvalidCharacter {
            character: '$',
            position: 4,
        };
        assert_eq!(err.position(), 4);
        assert_eq!(
            err.to_string(),
            "Fields parameter cannot contain character '$' (position 4)."
        );
    }
}
