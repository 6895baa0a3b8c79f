//! `<chamber>/<state>/<district>` search strings typed into the interactive table,
//! e.g. `s/ak` or `h/co/3`. Parsing never fails: a token that doesn't parse is
//! simply not a constraint (except a non-numeric district, which matches nothing).

use crate::query::filter::{Criterion, RaceQuery, StateMatch};
use crate::types::{leading_integer, Chamber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistrictToken {
    Number(u32),
    Invalid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shorthand {
    /// Overrides the active chamber tab when set.
    pub chamber: Option<Chamber>,
    /// Uppercased state prefix.
    pub state_prefix: Option<String>,
    pub district: Option<DistrictToken>,
}

impl Shorthand {
    pub fn parse(input: &str) -> Self {
        let lowered = input.trim().to_lowercase();
        let mut tokens = lowered.split('/');

        let chamber = tokens.next().and_then(|t| {
            let mut chars = t.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Chamber::from_code(c),
                _ => None,
            }
        });
        let state_prefix = tokens
            .next()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_uppercase());
        let district = tokens.next().filter(|t| !t.is_empty()).map(|t| {
            leading_integer(t).map_or(DistrictToken::Invalid, DistrictToken::Number)
        });

        Self { chamber, state_prefix, district }
    }

    pub fn is_empty(&self) -> bool {
        self.chamber.is_none() && self.state_prefix.is_none() && self.district.is_none()
    }

    pub fn active_chamber(&self, tab: Chamber) -> Chamber {
        self.chamber.unwrap_or(tab)
    }

    /// Filter intent for the table: the active chamber plus whatever tokens were given.
    pub fn to_query(&self, tab: Chamber) -> RaceQuery {
        let mut query = RaceQuery::default()
            .with(Criterion::Chamber(self.active_chamber(tab).as_str().to_string()));
        if let Some(prefix) = &self.state_prefix {
            query = query.with(Criterion::State(StateMatch::Prefix(prefix.clone())));
        }
        match self.district {
            Some(DistrictToken::Number(n)) => query = query.with(Criterion::District(Some(n))),
            Some(DistrictToken::Invalid) => query = query.with(Criterion::District(None)),
            None => {}
        }
        query
    }
}
