use std::fmt;

use crate::error::{Error, Result};

/// A transceiver's or media section's send/receive direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Inactive,
    Sendonly,
    Recvonly,
    Sendrecv,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inactive => "inactive",
            Direction::Sendonly => "sendonly",
            Direction::Recvonly => "recvonly",
            Direction::Sendrecv => "sendrecv",
        }
    }

    /// The mirror image across the send/receive axis: `sendonly` and
    /// `recvonly` swap, `sendrecv`/`inactive` are fixed points. Used to
    /// state intersection symmetry (P3).
    pub fn mirror(self) -> Direction {
        match self {
            Direction::Sendonly => Direction::Recvonly,
            Direction::Recvonly => Direction::Sendonly,
            other => other,
        }
    }

    /// The direction intersection table of spec §4.2.
    pub fn intersect(offer_dir: Direction, answer_declared_dir: Direction) -> Result<Direction> {
        use Direction::*;
        let result = match (offer_dir, answer_declared_dir) {
            (Sendonly, Sendrecv) => Recvonly,
            (Sendonly, Recvonly) => Recvonly,
            (Recvonly, Sendrecv) => Sendonly,
            (Recvonly, Sendonly) => Sendonly,
            (Sendrecv, Sendrecv) => Sendrecv,
            (Sendrecv, Sendonly) => Sendonly,
            (Sendrecv, Recvonly) => Recvonly,
            (_, Inactive) | (Inactive, _) => Inactive,
            (Sendonly, Sendonly) => Sendonly,
            (Recvonly, Recvonly) => Recvonly,
        };
        Ok(result)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Direction {
    fn from(raw: &str) -> Self {
        match raw {
            "sendonly" => Direction::Sendonly,
            "recvonly" => Direction::Recvonly,
            "sendrecv" => Direction::Sendrecv,
            _ => Direction::Inactive,
        }
    }
}

/// The negotiated DTLS role tag carried by the SDP `setup` attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Setup {
    Actpass,
    Active,
    Passive,
}

impl Setup {
    pub fn as_str(self) -> &'static str {
        match self {
            Setup::Actpass => "actpass",
            Setup::Active => "active",
            Setup::Passive => "passive",
        }
    }

    /// The setup intersection table of spec §4.2. `None` means "the
    /// remote offer supplied no setup value and the local side has no
    /// stored preference" (Open Question 2 in DESIGN.md: defaults to
    /// `Active`, same as `remote none`).
    pub fn answer_for(remote: Option<Setup>) -> Result<Setup> {
        match remote {
            Some(Setup::Actpass) => Ok(Setup::Active),
            Some(Setup::Passive) => Ok(Setup::Active),
            Some(Setup::Active) => Ok(Setup::Passive),
            None => Ok(Setup::Active),
        }
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Setup {
    type Error = Error;

    fn try_from(raw: &str) -> Result<Self> {
        match raw {
            "actpass" => Ok(Setup::Actpass),
            "active" => Ok(Setup::Active),
            "passive" => Ok(Setup::Passive),
            other => Err(Error::ErrSdpInvalidSetup {
                mline: 0,
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_direction_intersection_table() {
        use Direction::*;
        let tests = vec![
            (Sendonly, Sendrecv, Some(Recvonly)),
            (Sendonly, Recvonly, Some(Recvonly)),
            (Recvonly, Sendrecv, Some(Sendonly)),
            (Recvonly, Sendonly, Some(Sendonly)),
            (Sendrecv, Sendrecv, Some(Sendrecv)),
            (Sendrecv, Sendonly, Some(Sendonly)),
            (Sendrecv, Recvonly, Some(Recvonly)),
            (Inactive, Sendrecv, Some(Inactive)),
            (Sendrecv, Inactive, Some(Inactive)),
        ];
        for (a, b, want) in tests {
            let got = Direction::intersect(a, b).ok();
            assert_eq!(got, want, "intersect({a}, {b})");
        }
    }

    #[test]
    fn test_direction_intersection_symmetry_p3() {
        use Direction::*;
        let all = [Inactive, Sendonly, Recvonly, Sendrecv];
        for &a in &all {
            for &b in &all {
                let direct = Direction::intersect(a, b);
                let mirrored = Direction::intersect(a.mirror(), b.mirror()).map(Direction::mirror);
                assert_eq!(direct.is_ok(), mirrored.is_ok(), "a={a} b={b}");
                if let (Ok(d), Ok(m)) = (direct, mirrored) {
                    assert_eq!(d, m, "intersect({a},{b}) vs mirrored");
                }
            }
        }
    }

    #[test]
    fn test_setup_answer_table() {
        assert_eq!(Setup::answer_for(Some(Setup::Actpass)), Ok(Setup::Active));
        assert_eq!(Setup::answer_for(Some(Setup::Passive)), Ok(Setup::Active));
        assert_eq!(Setup::answer_for(Some(Setup::Active)), Ok(Setup::Passive));
        assert_eq!(Setup::answer_for(None), Ok(Setup::Active));
    }
}
