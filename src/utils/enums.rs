use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DstarPolError;

/// Truth-level classification of the process which generated a candidate.
///
/// Replaces the hand-coded integer origin codes of heavy-flavor analyses
/// (prompt = 4, feed-down = 5, anything else = background) with a closed
/// enumeration; routing over it is checked exhaustively at compile time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Produced directly in the charm fragmentation chain.
    Prompt,
    /// Produced in the decay of a beauty hadron.
    FeedDown,
    /// Combinatorial background or a matched particle of unknown ancestry.
    Background,
    /// Generated in an out-of-bunch pileup collision; never enters the
    /// acceptance histograms.
    OutOfBunchPileup,
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Prompt => write!(f, "prompt"),
            Origin::FeedDown => write!(f, "feed-down"),
            Origin::Background => write!(f, "background"),
            Origin::OutOfBunchPileup => write!(f, "out-of-bunch pileup"),
        }
    }
}

impl FromStr for Origin {
    type Err = DstarPolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prompt" | "fromc" | "c" => Ok(Self::Prompt),
            "feed-down" | "feeddown" | "fromb" | "b" => Ok(Self::FeedDown),
            "background" | "bkg" => Ok(Self::Background),
            "out-of-bunch pileup" | "oob" | "pileup" => Ok(Self::OutOfBunchPileup),
            _ => Err(DstarPolError::ParseError {
                name: s.to_string(),
                object: "Origin".to_string(),
            }),
        }
    }
}

/// Destination channels for candidate-level (reconstructed) deposits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoChannel {
    /// All candidates; used when no truth information is requested.
    All,
    /// Truth-matched prompt candidates.
    FromC,
    /// Truth-matched feed-down candidates.
    FromB,
    /// Candidates with truth requested but no match.
    Bkg,
}

impl RecoChannel {
    /// The channels in storage order.
    pub const ALL: [RecoChannel; 4] = [Self::All, Self::FromC, Self::FromB, Self::Bkg];

    /// Histogram label, matching the conventional sparse names.
    pub fn label(&self) -> &'static str {
        match self {
            RecoChannel::All => "all",
            RecoChannel::FromC => "fromC",
            RecoChannel::FromB => "fromB",
            RecoChannel::Bkg => "bkg",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            RecoChannel::All => 0,
            RecoChannel::FromC => 1,
            RecoChannel::FromB => 2,
            RecoChannel::Bkg => 3,
        }
    }
}

impl Display for RecoChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RecoChannel {
    type Err = DstarPolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "fromc" => Ok(Self::FromC),
            "fromb" => Ok(Self::FromB),
            "bkg" | "background" => Ok(Self::Bkg),
            _ => Err(DstarPolError::ParseError {
                name: s.to_string(),
                object: "RecoChannel".to_string(),
            }),
        }
    }
}

/// Destination channels for generation-level acceptance deposits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccChannel {
    /// Prompt generated particles.
    FromC,
    /// Feed-down generated particles.
    FromB,
}

impl AccChannel {
    /// The channels in storage order.
    pub const ALL: [AccChannel; 2] = [Self::FromC, Self::FromB];

    /// Histogram label, matching the conventional sparse names.
    pub fn label(&self) -> &'static str {
        match self {
            AccChannel::FromC => "fromC",
            AccChannel::FromB => "fromB",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            AccChannel::FromC => 0,
            AccChannel::FromB => 1,
        }
    }
}

impl Display for AccChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for AccChannel {
    type Err = DstarPolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fromc" => Ok(Self::FromC),
            "fromb" => Ok(Self::FromB),
            _ => Err(DstarPolError::ParseError {
                name: s.to_string(),
                object: "AccChannel".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enum_displays() {
        assert_eq!(format!("{}", Origin::Prompt), "prompt");
        assert_eq!(format!("{}", Origin::FeedDown), "feed-down");
        assert_eq!(format!("{}", RecoChannel::FromC), "fromC");
        assert_eq!(format!("{}", RecoChannel::Bkg), "bkg");
        assert_eq!(format!("{}", AccChannel::FromB), "fromB");
    }

    #[test]
    fn enum_from_str() {
        assert_eq!(Origin::from_str("prompt").unwrap(), Origin::Prompt);
        assert_eq!(Origin::from_str("fromB").unwrap(), Origin::FeedDown);
        assert_eq!(Origin::from_str("pileup").unwrap(), Origin::OutOfBunchPileup);
        assert_eq!(RecoChannel::from_str("all").unwrap(), RecoChannel::All);
        assert_eq!(RecoChannel::from_str("bkg").unwrap(), RecoChannel::Bkg);
        assert_eq!(AccChannel::from_str("fromC").unwrap(), AccChannel::FromC);
        assert!(Origin::from_str("sideband").is_err());
    }
}
