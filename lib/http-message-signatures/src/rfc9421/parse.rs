use super::SignatureParams;
use logos::{Lexer, Logos};
use miette::Diagnostic;
use thiserror::Error;

/// Signature header parsing error
#[derive(Debug, Diagnostic, Error)]
#[error("Malformed signature header")]
pub struct ParseError;

#[derive(Debug, Logos, PartialEq)]
#[logos(skip r"[ \t]+")]
enum TokenTy {
    #[regex(r"[A-Za-z][A-Za-z0-9_\-]*")]
    Label,

    #[token("=")]
    Equals,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(";")]
    Semicolon,

    #[regex(r#""[^"]*""#)]
    String,

    #[regex(r"\d+")]
    Number,

    #[regex(r":[A-Za-z0-9+/=]+:")]
    ByteSequence,
}

/// Parsed `Signature-Input` header
pub struct SignatureInput<'a> {
    /// Signature label the parameters belong to
    pub label: &'a str,

    /// The declared signature parameters
    pub params: SignatureParams<'a>,
}

struct Tokens<'a> {
    lexer: Lexer<'a, TokenTy>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
        }
    }

    /// Next token, where running out of input is a parse error
    fn expect(&mut self, ty: TokenTy) -> Result<&'a str, ParseError> {
        let token = self.lexer.next().ok_or(ParseError)?.map_err(|()| ParseError)?;
        if token != ty {
            return Err(ParseError);
        }

        Ok(self.lexer.slice())
    }

    fn next(&mut self) -> Option<Result<(TokenTy, &'a str), ParseError>> {
        let token = self.lexer.next()?;

        Some(
            token
                .map(|ty| (ty, self.lexer.slice()))
                .map_err(|()| ParseError),
        )
    }
}

/// Parse a `Signature-Input` header value
///
/// Expected shape: `sig1=("@method" "@target-uri" …);created=<t>;keyid="<id>"`.
/// `created` and `keyid` are mandatory, unknown parameters reject the header —
/// the signature base reproduces exactly these parameters, so silently
/// dropping one would only ever manufacture false negatives.
pub fn parse_signature_input(input: &str) -> Result<SignatureInput<'_>, ParseError> {
    let mut tokens = Tokens::new(input);

    let label = tokens.expect(TokenTy::Label)?;
    tokens.expect(TokenTy::Equals)?;
    tokens.expect(TokenTy::LParen)?;

    let mut components = Vec::new();
    loop {
        match tokens.next().ok_or(ParseError)?? {
            (TokenTy::String, raw) => components.push(raw.trim_matches('"')),
            (TokenTy::RParen, ..) => break,
            _ => return Err(ParseError),
        }
    }

    let mut created = None;
    let mut key_id = None;

    while let Some(token) = tokens.next() {
        let (TokenTy::Semicolon, ..) = token? else {
            return Err(ParseError);
        };

        let name = tokens.expect(TokenTy::Label)?;
        tokens.expect(TokenTy::Equals)?;

        match name {
            "created" => {
                let raw = tokens.expect(TokenTy::Number)?;
                created = Some(atoi_radix10::parse_from_str(raw).map_err(|_| ParseError)?);
            }
            "keyid" => {
                let raw = tokens.expect(TokenTy::String)?;
                key_id = Some(raw.trim_matches('"'));
            }
            _ => return Err(ParseError),
        }
    }

    Ok(SignatureInput {
        label,
        params: SignatureParams {
            components,
            created: created.ok_or(ParseError)?,
            key_id: key_id.ok_or(ParseError)?,
        },
    })
}

/// Parse a `Signature` header value of the shape `sig1=:<base64>:`
///
/// Returns the label and the Base64 signature without its surrounding colons.
pub fn parse_signature(input: &str) -> Result<(&str, &str), ParseError> {
    let mut tokens = Tokens::new(input);

    let label = tokens.expect(TokenTy::Label)?;
    tokens.expect(TokenTy::Equals)?;
    let sequence = tokens.expect(TokenTy::ByteSequence)?;

    if tokens.next().is_some() {
        return Err(ParseError);
    }

    Ok((label, sequence.trim_matches(':')))
}
