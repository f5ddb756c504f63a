//! Stylesheet URL extraction.
//!
//! Tokenizes a stylesheet and collects every URL token, recursing into rule
//! bodies, functions, and bracketed blocks so `url()` references are found at
//! any nesting depth (`@media`, `@font-face`, shorthand values, …). Bad URL
//! tokens are collected as complaints; they never abort the walk.

use cssparser::{ParseError, Parser, ParserInput, Token};

/// All URL references in `css`, plus parse complaints (at most a handful,
/// reported once per page by the caller).
#[must_use]
pub fn stylesheet_urls(css: &str) -> (Vec<String>, Vec<String>) {
    let mut urls = Vec::new();
    let mut errors = Vec::new();
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    walk(&mut parser, &mut urls, &mut errors);
    (urls, errors)
}

fn walk(parser: &mut Parser<'_, '_>, urls: &mut Vec<String>, errors: &mut Vec<String>) {
    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => return, // end of this block
        };
        match token {
            Token::UnquotedUrl(url) => urls.push(url.to_string()),
            Token::BadUrl(url) => errors.push(format!("CSS: bad url token: {}", &*url)),
            Token::BadString(s) => errors.push(format!("CSS: bad string token: {}", &*s)),
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                // url("…") with a quoted argument tokenizes as a function
                let result: Result<(), ParseError<'_, ()>> = parser.parse_nested_block(|block| {
                    while let Ok(inner) = block.next() {
                        if let Token::QuotedString(s) = inner {
                            urls.push(s.to_string());
                        }
                    }
                    Ok(())
                });
                if let Err(e) = result {
                    errors.push(format!("CSS: {e:?}"));
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let result: Result<(), ParseError<'_, ()>> = parser.parse_nested_block(|block| {
                    walk(block, urls, errors);
                    Ok(())
                });
                if let Err(e) = result {
                    errors.push(format!("CSS: {e:?}"));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquoted_and_quoted_urls() {
        let (urls, errors) = stylesheet_urls(
            r#"body { background: url(bg.png); } .x { cursor: url("cur.svg"), auto; }"#,
        );
        assert_eq!(urls, vec!["bg.png", "cur.svg"]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_urls_inside_at_rules() {
        let (urls, _) = stylesheet_urls(
            r#"@media screen { .a { background-image: url('deep.png'); } }
               @font-face { src: url(font.woff2) format("woff2"); }"#,
        );
        assert_eq!(urls, vec!["deep.png", "font.woff2"]);
    }

    #[test]
    fn test_import_url_form() {
        let (urls, _) = stylesheet_urls(r#"@import url("extra.css");"#);
        assert_eq!(urls, vec!["extra.css"]);
    }

    #[test]
    fn test_bad_url_is_a_complaint_not_a_failure() {
        let (urls, errors) = stylesheet_urls("a { background: url(bad one); color: red } b { background: url(ok.png) }");
        assert!(!errors.is_empty());
        assert_eq!(urls, vec!["ok.png"]);
    }
}
