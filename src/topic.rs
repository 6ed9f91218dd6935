// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire topic codec.
//!
//! Converts between `(plate, data point, attribute)` triples and MQTT topic
//! strings in both directions. Inbound state topics have the shape
//! `<base>/<plate>/state/<dp>[.<attr>]` or `<base>/<plate>/state/<dp>/<attr>`;
//! outbound command topics have the shape `<base>/<plate>/command/<dp>[.<suffix>]`.
//!
//! Both functions are pure; malformed or foreign topics parse to `None` rather
//! than an error, since they are expected noise on a shared broker.

/// A parsed inbound state topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTopic {
    /// Plate (panel) identifier.
    pub plate: String,

    /// Data point name. May be empty when the topic carried no remainder;
    /// callers must reject empty names downstream.
    pub dp: String,

    /// Attribute segment, empty when the topic carried none.
    pub attr: String,
}

/// Parse an inbound state topic.
///
/// Requires the exact `<base>/<plate>/state/...` prefix shape with `base`
/// equal to the configured base topic. The remainder is split into data point
/// and attribute: a `/`-delimited attribute takes priority over a
/// `.`-delimited one.
pub fn parse_state_topic(base: &str, topic: &str) -> Option<StateTopic> {
    let unprefixed = topic.strip_prefix(base)?.strip_prefix('/')?;
    let (plate, tail) = unprefixed.split_once('/')?;

    let rest = if tail == "state" {
        ""
    } else {
        tail.strip_prefix("state/")?
    };

    let (dp, attr) = if let Some((dp, attr)) = rest.rsplit_once('/') {
        (dp, attr)
    } else if let Some((dp, attr)) = rest.rsplit_once('.') {
        (dp, attr)
    } else {
        (rest, "")
    };

    Some(StateTopic {
        plate: plate.to_string(),
        dp: dp.trim_end_matches('.').to_string(),
        attr: attr.trim_start_matches('.').to_string(),
    })
}

/// Build an outbound command topic.
///
/// Topic separator characters must never appear inside a data point name on
/// the wire: trailing `/` and `+` are stripped from `dp`, then any remaining
/// `/` removed. The suffix segment is omitted entirely when the suffix is
/// empty after cleaning.
pub fn build_command_topic(base: &str, plate: &str, dp: &str, suffix: &str) -> String {
    let dp = dp.trim_end_matches(['/', '+']).replace('/', "");
    let suffix = suffix.trim_start_matches('.').replace('/', "");

    if suffix.is_empty() {
        format!("{}/{}/command/{}", base, plate, dp)
    } else {
        format!("{}/{}/command/{}.{}", base, plate, dp, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(topic: &str) -> Option<StateTopic> {
        parse_state_topic("hasp", topic)
    }

    #[test]
    fn test_parse_dot_attribute() {
        let parsed = parse("hasp/plate1/state/p1b1.val").expect("parse");
        assert_eq!(parsed.plate, "plate1");
        assert_eq!(parsed.dp, "p1b1");
        assert_eq!(parsed.attr, "val");
    }

    #[test]
    fn test_parse_slash_attribute() {
        let parsed = parse("hasp/plate1/state/p1b1/bri").expect("parse");
        assert_eq!(parsed.dp, "p1b1");
        assert_eq!(parsed.attr, "bri");
    }

    #[test]
    fn test_parse_no_attribute() {
        let parsed = parse("hasp/plate1/state/p1b1").expect("parse");
        assert_eq!(parsed.dp, "p1b1");
        assert_eq!(parsed.attr, "");
    }

    #[test]
    fn test_parse_slash_wins_over_dot() {
        // The segment after the last `/` is the attribute, even when it
        // contains dots itself.
        let parsed = parse("hasp/plate1/state/p1b1.x/bri").expect("parse");
        assert_eq!(parsed.dp, "p1b1.x");
        assert_eq!(parsed.attr, "bri");
    }

    #[test]
    fn test_parse_dp_keeps_inner_dots() {
        let parsed = parse("hasp/plate1/state/group.p1b1.val").expect("parse");
        assert_eq!(parsed.dp, "group.p1b1");
        assert_eq!(parsed.attr, "val");
    }

    #[test]
    fn test_parse_strips_stray_dots() {
        let parsed = parse("hasp/plate1/state/p1b1..val").expect("parse");
        assert_eq!(parsed.dp, "p1b1");
        assert_eq!(parsed.attr, "val");
    }

    #[test]
    fn test_parse_empty_rest_succeeds() {
        let parsed = parse("hasp/plate1/state").expect("parse");
        assert_eq!(parsed.dp, "");
        assert_eq!(parsed.attr, "");

        let parsed = parse("hasp/plate1/state/").expect("parse");
        assert_eq!(parsed.dp, "");
    }

    #[test]
    fn test_parse_rejects_foreign_topics() {
        assert!(parse("other/plate1/state/p1b1").is_none());
        assert!(parse("hasp/plate1/command/p1b1").is_none());
        assert!(parse("hasp/plate1").is_none());
        assert!(parse("hasp").is_none());
        // Base must match as a whole segment, not a prefix.
        assert!(parse("haspx/plate1/state/p1b1").is_none());
    }

    #[test]
    fn test_build_plain() {
        assert_eq!(
            build_command_topic("hasp", "plate1", "p1b1", ""),
            "hasp/plate1/command/p1b1"
        );
    }

    #[test]
    fn test_build_with_suffix() {
        assert_eq!(
            build_command_topic("hasp", "plate1", "p1b1", "bri"),
            "hasp/plate1/command/p1b1.bri"
        );
    }

    #[test]
    fn test_build_strips_separators() {
        // Trailing `/` and `+` stripped, inner `/` removed, leading dot on
        // the suffix stripped.
        assert_eq!(
            build_command_topic("hasp", "plate1", "p1/b1+", ".bri"),
            "hasp/plate1/command/p1b1.bri"
        );
        assert_eq!(
            build_command_topic("hasp", "plate1", "p1b1", "b/ri"),
            "hasp/plate1/command/p1b1.bri"
        );
    }

    #[test]
    fn test_build_suffix_empty_after_cleaning() {
        assert_eq!(
            build_command_topic("hasp", "plate1", "p1b1", "./"),
            "hasp/plate1/command/p1b1"
        );
    }

    #[test]
    fn test_round_trip() {
        for (plate, dp, suffix) in [
            ("plate1", "p1b1", "val"),
            ("plate1", "p1b1", "bri"),
            ("panel", "btn2", ""),
        ] {
            let command = build_command_topic("hasp", plate, dp, suffix);
            let state = command.replace("command", "state");
            let parsed = parse_state_topic("hasp", &state).expect("round trip");
            assert_eq!(parsed.plate, plate);
            assert_eq!(parsed.dp, dp);
            assert_eq!(parsed.attr, suffix);
        }
    }
}
