//! Button-driven conversation, derived entirely from the callback token.
//!
//! Token grammar:
//!
//! ```text
//! new                   -> pair menu
//! pair:<PAIR>           -> timeframe menu for PAIR
//! tf:<PAIR>:<TIMEFRAME> -> completed selection
//! ```
//!
//! Nothing is stored between events. Every menu writes the context the next
//! step needs into its own button tokens.

use std::sync::Arc;

use common::config::AppConfig;
use common::models::{Pair, Timeframe};
use thiserror::Error;

use crate::services::platform::{Button, Menu};

pub const NEW_TOKEN: &str = "new";
const PAIR_PREFIX: &str = "pair:";
const TIMEFRAME_PREFIX: &str = "tf:";
const SEPARATOR: char = ':';

const WELCOME_TEXT: &str =
    "Welcome to the Forex Signal Bot 🔥\nClick 'New Trade' to generate a signal.";
const NEW_TRADE_LABEL: &str = "📊 New Trade";
const ERROR_TEXT: &str = "Unrecognised selection. Please start again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed token {token:?}: {reason}")]
pub struct MalformedToken {
    pub token: String,
    pub reason: &'static str,
}

impl MalformedToken {
    fn new(token: &str, reason: &'static str) -> Self {
        Self {
            token: token.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub pair: Pair,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    AwaitingPairChoice,
    AwaitingTimeframeChoice(Pair),
    Completed(Selection),
}

impl ConversationState {
    /// Token that leads to this state.
    pub fn token(&self) -> String {
        match self {
            Self::AwaitingPairChoice => NEW_TOKEN.to_string(),
            Self::AwaitingTimeframeChoice(pair) => format!("{}{}", PAIR_PREFIX, pair),
            Self::Completed(sel) => {
                format!("{}{}{}{}", TIMEFRAME_PREFIX, sel.pair, SEPARATOR, sel.timeframe)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Show(Menu),
    Completed(Selection),
}

pub struct Conversation {
    config: Arc<AppConfig>,
}

impl Conversation {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    pub fn parse(&self, token: &str) -> Result<ConversationState, MalformedToken> {
        if token == NEW_TOKEN {
            return Ok(ConversationState::AwaitingPairChoice);
        }

        if let Some(code) = token.strip_prefix(PAIR_PREFIX) {
            let pair = self.lookup_pair(token, code)?;
            return Ok(ConversationState::AwaitingTimeframeChoice(pair));
        }

        if let Some(rest) = token.strip_prefix(TIMEFRAME_PREFIX) {
            let (code, tf_code) = rest
                .split_once(SEPARATOR)
                .ok_or_else(|| MalformedToken::new(token, "missing timeframe"))?;
            let pair = self.lookup_pair(token, code)?;
            let timeframe = tf_code
                .parse::<Timeframe>()
                .ok()
                .filter(|tf| self.config.timeframes.contains(tf))
                .ok_or_else(|| MalformedToken::new(token, "unknown timeframe"))?;
            return Ok(ConversationState::Completed(Selection { pair, timeframe }));
        }

        Err(MalformedToken::new(token, "unknown prefix"))
    }

    pub fn transition(&self, token: &str) -> Result<Transition, MalformedToken> {
        Ok(match self.parse(token)? {
            ConversationState::AwaitingPairChoice => Transition::Show(self.pair_menu()),
            ConversationState::AwaitingTimeframeChoice(pair) => {
                Transition::Show(self.timeframe_menu(&pair))
            }
            ConversationState::Completed(selection) => Transition::Completed(selection),
        })
    }

    fn lookup_pair(&self, token: &str, code: &str) -> Result<Pair, MalformedToken> {
        self.config
            .universe
            .get(code)
            .cloned()
            .ok_or_else(|| MalformedToken::new(token, "unknown pair"))
    }

    pub fn main_menu(&self) -> Menu {
        Self::with_new_trade(WELCOME_TEXT)
    }

    /// Any text followed by the single "New Trade" button.
    pub fn with_new_trade(text: impl Into<String>) -> Menu {
        Menu::stacked(text, [Button::new(NEW_TRADE_LABEL, NEW_TOKEN)])
    }

    pub fn error_menu(&self) -> Menu {
        Self::with_new_trade(ERROR_TEXT)
    }

    pub fn pair_menu(&self) -> Menu {
        let buttons = self.config.universe.pairs().iter().map(|pair| {
            let next = ConversationState::AwaitingTimeframeChoice(pair.clone());
            Button::new(pair.code(), next.token())
        });
        Menu::stacked("Select Pair:", buttons)
    }

    pub fn timeframe_menu(&self, pair: &Pair) -> Menu {
        let buttons = self.config.timeframes.iter().map(|&timeframe| {
            let next = ConversationState::Completed(Selection {
                pair: pair.clone(),
                timeframe,
            });
            Button::new(timeframe.code(), next.token())
        });
        Menu::stacked(format!("Selected: {}\nSelect Timeframe:", pair), buttons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation::new(Arc::new(AppConfig::new("token", -100)))
    }

    fn pair(code: &str) -> Pair {
        Pair::new(code).unwrap()
    }

    #[test]
    fn test_new_shows_every_pair_in_universe_order() {
        let conv = conversation();
        let Transition::Show(menu) = conv.transition("new").unwrap() else {
            panic!("expected a menu");
        };

        let labels: Vec<&str> = menu.buttons().map(|b| b.label.as_str()).collect();
        let expected: Vec<&str> = common::models::DEFAULT_PAIRS.to_vec();
        assert_eq!(labels, expected);
        assert!(menu.rows.iter().all(|row| row.len() == 1));
        assert_eq!(menu.rows[0][0].token, "pair:EURUSD");
    }

    #[test]
    fn test_pair_token_shows_timeframes_for_that_pair() {
        let conv = conversation();
        let Transition::Show(menu) = conv.transition("pair:GBPJPY").unwrap() else {
            panic!("expected a menu");
        };

        assert_eq!(menu.text, "Selected: GBPJPY\nSelect Timeframe:");
        let tokens: Vec<&str> = menu.buttons().map(|b| b.token.as_str()).collect();
        assert_eq!(tokens, vec!["tf:GBPJPY:1m", "tf:GBPJPY:5m", "tf:GBPJPY:15m"]);
    }

    #[test]
    fn test_pair_then_timeframe_completes_selection() {
        let conv = conversation();
        assert!(matches!(conv.transition("pair:EURUSD"), Ok(Transition::Show(_))));
        assert_eq!(
            conv.transition("tf:EURUSD:5m").unwrap(),
            Transition::Completed(Selection {
                pair: pair("EURUSD"),
                timeframe: Timeframe::FiveMinutes,
            })
        );
    }

    #[test]
    fn test_every_button_token_is_accepted_by_the_next_step() {
        let conv = conversation();
        for pair_button in conv.pair_menu().buttons() {
            let Transition::Show(tf_menu) = conv.transition(&pair_button.token).unwrap() else {
                panic!("{} did not show a menu", pair_button.token);
            };
            for tf_button in tf_menu.buttons() {
                let Transition::Completed(sel) = conv.transition(&tf_button.token).unwrap() else {
                    panic!("{} did not complete", tf_button.token);
                };
                assert_eq!(sel.pair.code(), pair_button.label);
                assert_eq!(sel.timeframe.code(), tf_button.label);
            }
        }
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let conv = conversation();
        let cases = [
            ("", "unknown prefix"),
            ("New", "unknown prefix"),
            ("new_trade", "unknown prefix"),
            ("pair_EURUSD", "unknown prefix"),
            ("foo:EURUSD", "unknown prefix"),
            ("pair:", "unknown pair"),
            ("pair:XXXYYY", "unknown pair"),
            ("pair:eurusd", "unknown pair"),
            ("pair:EURUSD:5m", "unknown pair"),
            ("tf:EURUSD", "missing timeframe"),
            ("tf::5m", "unknown pair"),
            ("tf:EURUSD:4h", "unknown timeframe"),
            ("tf:EURUSD:5m:extra", "unknown timeframe"),
            ("tf:EURUSD:", "unknown timeframe"),
        ];

        for (token, reason) in cases {
            assert_eq!(
                conv.transition(token),
                Err(MalformedToken::new(token, reason)),
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_timeframes_not_offered_are_rejected() {
        let mut config = AppConfig::new("token", -100);
        config.timeframes = vec![Timeframe::FiveMinutes];
        let conv = Conversation::new(Arc::new(config));

        assert!(conv.transition("tf:EURUSD:5m").is_ok());
        assert!(conv.transition("tf:EURUSD:1m").is_err());
        assert_eq!(conv.timeframe_menu(&pair("EURUSD")).buttons().count(), 1);
    }

    #[test]
    fn test_main_and_error_menus_restart_the_flow() {
        let conv = conversation();
        for menu in [conv.main_menu(), conv.error_menu()] {
            let tokens: Vec<&str> = menu.buttons().map(|b| b.token.as_str()).collect();
            assert_eq!(tokens, vec![NEW_TOKEN]);
        }
    }
}
