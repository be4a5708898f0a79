//! Directive tokenizer tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use extmetrics_core::directive::Directive;
use extmetrics_core::ExtMetricsError;

#[test]
fn bare_name() {
    let d = Directive::parse("extend_metrics").unwrap();
    assert_eq!(d.name, "extend_metrics");
    assert!(d.args.is_empty());
    d.expect_no_args().unwrap();
}

#[test]
fn extra_argument_is_rejected() {
    let d = Directive::parse("extend_metrics verbose").unwrap();
    match d.expect_no_args() {
        Err(ExtMetricsError::ArgErr { directive, arg }) => {
            assert_eq!(directive, "extend_metrics");
            assert_eq!(arg, "verbose");
        }
        other => panic!("expected ArgErr, got {other:?}"),
    }
}

#[test]
fn quoted_args_keep_spaces() {
    let d = Directive::parse(r#"respond 200 "hello world""#).unwrap();
    assert_eq!(d.name, "respond");
    assert_eq!(d.args, vec!["200", "hello world"]);
    assert_eq!(d.arg(1).unwrap(), "hello world");
}

#[test]
fn escaped_quote_and_empty_token() {
    let d = Directive::parse(r#"respond 200 "say \"hi\"" """#).unwrap();
    assert_eq!(d.args, vec!["200", "say \"hi\"", ""]);
}

#[test]
fn surrounding_whitespace_ignored() {
    let d = Directive::parse("   header  x-a   b  ").unwrap();
    assert_eq!(d.name, "header");
    assert_eq!(d.args, vec!["x-a", "b"]);
    d.expect_at_most(2).unwrap();
    assert!(d.expect_at_most(1).is_err());
}

#[test]
fn empty_and_unterminated() {
    assert!(matches!(
        Directive::parse("   "),
        Err(ExtMetricsError::BadConfig(_))
    ));
    assert!(matches!(
        Directive::parse(r#"respond 200 "oops"#),
        Err(ExtMetricsError::BadConfig(_))
    ));
}

#[test]
fn missing_positional_argument() {
    let d = Directive::parse("respond").unwrap();
    assert!(matches!(d.arg(0), Err(ExtMetricsError::ArgErr { .. })));
}
