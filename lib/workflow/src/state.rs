//! Graph state and how node updates are folded into it.

/// State threaded through a graph run.
///
/// Nodes never mutate the state directly. Each returns an `Update` which the
/// executor applies in order, so a run can be replayed from its updates.
/// Implementations should append to message lists rather than replace them.
pub trait GraphState: Clone + Send + Sync + 'static {
    /// A partial change produced by one node.
    type Update: Clone + Send + Sync + std::fmt::Debug + 'static;

    /// Folds an update into the state.
    fn apply(&mut self, update: Self::Update);
}

#[cfg(test)]
pub(crate) mod test_state {
    use super::GraphState;

    /// Minimal state used by the crate's tests.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Trail {
        pub messages: Vec<String>,
        pub next: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct TrailUpdate {
        pub messages: Vec<String>,
        pub next: Option<String>,
    }

    impl TrailUpdate {
        pub fn say(text: &str) -> Self {
            Self {
                messages: vec![text.to_string()],
                next: None,
            }
        }

        pub fn route(label: &str) -> Self {
            Self {
                messages: Vec::new(),
                next: Some(label.to_string()),
            }
        }
    }

    impl GraphState for Trail {
        type Update = TrailUpdate;

        fn apply(&mut self, update: TrailUpdate) {
            self.messages.extend(update.messages);
            if let Some(next) = update.next {
                self.next = next;
            }
        }
    }

    #[test]
    fn apply_appends_messages_and_replaces_route() {
        let mut state = Trail::default();
        state.apply(TrailUpdate::say("hello"));
        state.apply(TrailUpdate::route("PricingAgent"));
        state.apply(TrailUpdate::say("price is 100"));
        assert_eq!(state.messages, vec!["hello", "price is 100"]);
        assert_eq!(state.next, "PricingAgent");
    }
}
