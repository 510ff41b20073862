use super::SignatureHeader;
use logos::{Lexer, Logos, Span};
use miette::Diagnostic;
use thiserror::Error;

/// Signature header parsing error
#[derive(Debug, Diagnostic, Error)]
#[error("Malformed signature header")]
pub struct ParseError;

#[derive(Debug, Logos)]
#[logos(skip r"[ \t]+")]
enum TokenTy {
    #[regex(r"[a-zA-Z]\w*")]
    Key,

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#)]
    Value,

    #[regex(r"\d+")]
    Number,

    #[token(",")]
    Comma,
}

struct Token {
    ty: TokenTy,
    span: Span,
}

/// Iterator yielding `key=value` pairs off the token stream
///
/// Fuses itself on the first illegal token and yields nothing afterwards
struct PairIter<'a> {
    lexer: Lexer<'a, TokenTy>,
    is_broken: bool,
}

impl<'a> PairIter<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            is_broken: false,
        }
    }

    fn next_token(&mut self) -> Option<Result<Token, ParseError>> {
        let ty = self.lexer.next()?;
        let span = self.lexer.span();

        Some(
            ty.map(|ty| Token { ty, span })
                .map_err(|()| ParseError),
        )
    }
}

macro_rules! ensure {
    ($self:expr, $token:expr, $pattern:pat) => {{
        let Some(Ok(token)) = $token else {
            $self.is_broken = true;
            return Some(Err(ParseError));
        };

        if !matches!(token.ty, $pattern) {
            $self.is_broken = true;
            return Some(Err(ParseError));
        }

        token
    }};
}

impl<'a> Iterator for PairIter<'a> {
    type Item = Result<(&'a str, &'a str), ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_broken {
            return None;
        }

        let key = ensure!(self, Some(self.next_token()?), TokenTy::Key);
        ensure!(self, Some(self.next_token()?), TokenTy::Equals);
        let value = ensure!(
            self,
            Some(self.next_token()?),
            TokenTy::Value | TokenTy::Number
        );

        if let Some(next) = self.next_token() {
            ensure!(self, Some(next), TokenTy::Comma);
        }

        let source = self.lexer.source();
        let key = &source[key.span];
        let value = source[value.span].trim_matches('"');

        Some(Ok((key, value)))
    }
}

/// Parse a cavage `Signature` header into its structured representation
///
/// Unknown fields reject the header outright. A missing `keyId`, `signature`
/// or `headers` field does the same.
#[inline]
pub fn parse(input: &str) -> Result<SignatureHeader<'_>, ParseError> {
    let mut key_id = None;
    let mut algorithm = None;
    let mut signature = None;
    let mut headers = None;
    let mut created = None;
    let mut expires = None;

    for pair in PairIter::new(input) {
        let (key, value) = pair?;

        match key {
            "keyId" => key_id = Some(value),
            "algorithm" => algorithm = Some(value),
            "signature" => signature = Some(value),
            "headers" => headers = Some(value.split_whitespace().collect()),
            "created" => {
                created = Some(atoi_radix10::parse_from_str(value).map_err(|_| ParseError)?);
            }
            "expires" => {
                expires = Some(atoi_radix10::parse_from_str(value).map_err(|_| ParseError)?);
            }
            _ => return Err(ParseError),
        }
    }

    Ok(SignatureHeader {
        key_id: key_id.ok_or(ParseError)?,
        algorithm,
        headers: headers.ok_or(ParseError)?,
        signature: signature.ok_or(ParseError)?,
        created,
        expires,
    })
}

#[cfg(test)]
mod test {
    use super::parse;

    const HEADER: &str = r#"keyId="Test",algorithm="rsa-sha256",headers="(request-target) host date",signature="qdx+H7PHHDZgy4y/Ahn9Tny9V3GP6YgBPyUXMmoxWtLbHpUnXS2mg2+SbrQDMCJypxBLSPQR2aAjn7ndmw2iicw3HMbe8VfEdKFYRqzic+efkb3nndiv/x1xSHDJWeSWkx3ButlYSuBskLu6kd9Fswtemr3lgdDEmn04swr2Os0=""#;

    #[test]
    fn parse_header() {
        let header = parse(HEADER).unwrap();

        assert_eq!(header.key_id, "Test");
        assert_eq!(header.algorithm, Some("rsa-sha256"));
        assert_eq!(header.headers, ["(request-target)", "host", "date"]);
        assert_eq!(header.created, None);
        assert_eq!(header.expires, None);
    }

    #[test]
    fn parse_unquoted_timestamps() {
        let header = parse(
            r#"keyId="Test",created=1402170695, expires=1402170699,headers="(request-target) (created) (expires) host",signature="dGVzdA==""#,
        )
        .unwrap();

        assert_eq!(header.created, Some(1_402_170_695));
        assert_eq!(header.expires, Some(1_402_170_699));
    }

    #[test]
    fn reject_garbage() {
        assert!(parse("keyId=").is_err());
        assert!(parse(r#"signature="dGVzdA==""#).is_err());
        assert!(parse(r#"keyId="Test",unknown="field",signature="dGVzdA==",headers="host""#).is_err());
        assert!(parse("complete garbage !!!").is_err());
    }
}
