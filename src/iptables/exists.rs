use crate::error::Result;
use crate::iptables::runner::CommandRunner;

/// Exit code of `-C` when no matching rule exists
const RULE_NOT_FOUND: i32 = 1;

/// Asks the tool directly via `-C`
pub(super) fn check(
    runner: &CommandRunner,
    table: &str,
    chain: &str,
    rulespec: &[&str],
) -> Result<bool> {
    let mut args = vec!["-t", table, "-C", chain];
    args.extend_from_slice(rulespec);

    match runner.run(&args) {
        Ok(()) => Ok(true),
        Err(e) if e.exit_code() == Some(RULE_NOT_FOUND) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Fallback for tools without `-C`: search the rule in the table listing
pub(super) fn search_listing(
    runner: &CommandRunner,
    table: &str,
    chain: &str,
    rulespec: &[&str],
) -> Result<bool> {
    let listing = runner.run_with_output(&["-t", table, "-S"])?;
    Ok(listing_contains(&listing, chain, rulespec))
}

/// Substring match against `-S` output. Not token-aware: a rule that is a
/// prefix of a listed rule also matches.
fn listing_contains(listing: &str, chain: &str, rulespec: &[&str]) -> bool {
    let mut needle = format!("-A {chain}");
    for token in rulespec {
        needle.push(' ');
        needle.push_str(token);
    }

    listing.contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::iptables::runner::Serialization;
    use crate::iptables::tests::{Behavior, FakeTool};
    use assert_matches::assert_matches;

    const LISTING: &str = "\
-P INPUT ACCEPT
-P FORWARD DROP
-N custom
-A FORWARD -j ACCEPT
-A custom -s 10.0.0.1/32 -p tcp -m tcp --dport 22 -j ACCEPT
";

    #[test]
    fn listing_match() {
        assert!(listing_contains(LISTING, "FORWARD", &["-j", "ACCEPT"]));
        assert!(!listing_contains(LISTING, "FORWARD", &["-j", "DROP"]));
        assert!(!listing_contains(LISTING, "INPUT", &["-j", "ACCEPT"]));
        assert!(listing_contains(
            LISTING,
            "custom",
            &["-s", "10.0.0.1/32", "-p", "tcp", "-m", "tcp", "--dport", "22", "-j", "ACCEPT"]
        ));
    }

    #[test]
    fn listing_match_is_substring_based() {
        // Known limitation: prefixes of listed rules are reported as present
        assert!(listing_contains(LISTING, "custom", &["-s", "10.0.0.1/3"]));
        // ... while the same rule with reordered matches is not
        assert!(!listing_contains(
            LISTING,
            "custom",
            &["-p", "tcp", "-s", "10.0.0.1/32", "-m", "tcp", "--dport", "22", "-j", "ACCEPT"]
        ));
    }

    #[test]
    fn search_listing_lists_whole_table() {
        let tool = FakeTool::install("v1.4.5", Behavior::default().listing(LISTING));
        let runner = CommandRunner::new(tool.path().to_path_buf(), Serialization::NativeWait);

        assert!(search_listing(&runner, "filter", "FORWARD", &["-j", "ACCEPT"]).unwrap());
        assert!(!search_listing(&runner, "filter", "FORWARD", &["-j", "DROP"]).unwrap());
        assert_eq!(
            tool.invocations(),
            ["-t filter -S --wait", "-t filter -S --wait"]
        );
    }

    #[test]
    fn check_exit_codes() {
        let run = |status: i32| {
            let tool = FakeTool::install("v1.6.1", Behavior::default().exit("-C", status));
            let runner =
                CommandRunner::new(tool.path().to_path_buf(), Serialization::NativeWait);
            check(&runner, "nat", "POSTROUTING", &["-j", "MASQUERADE"])
        };

        assert!(run(0).unwrap());
        assert!(!run(1).unwrap());
        assert_matches!(run(2), Err(e @ Error::Exit { .. }) if e.exit_code() == Some(2));
    }
}
