use serde::{Deserialize, Serialize};

/// A registered team member. `teamno` doubles as the login secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub regno: String,
    pub name: String,
    pub teamname: String,
    pub teamno: String,
    pub email: String,
}

/// One leaderboard entry. Rows are append-only and never merged per team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub teamno: String,
    pub teamname: String,
    pub score: i64,
}

// The leaderboard wire format is a positional triple, not an object.
impl Serialize for Score {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.teamno, &self.teamname, self.score).serialize(serializer)
    }
}

/// Pointer from a registrant to the blob holding their certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub regno: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_serializes_as_triple() {
        let score = Score {
            teamno: "T1".to_string(),
            teamname: "Alpha".to_string(),
            score: 50,
        };
        let value = serde_json::to_value(&score).unwrap();
        assert_eq!(value, serde_json::json!(["T1", "Alpha", 50]));
    }
}
