#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    IPv4,
    IPv6,
}

impl Protocol {
    /// Name of the tool binary handling this protocol family
    pub fn command_name(self) -> &'static str {
        match self {
            Self::IPv4 => "iptables",
            Self::IPv6 => "ip6tables",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::IPv4 => write!(f, "IPv4"),
            Self::IPv6 => write!(f, "IPv6"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names() {
        assert_eq!(Protocol::IPv4.command_name(), "iptables");
        assert_eq!(Protocol::IPv6.command_name(), "ip6tables");
    }
}
