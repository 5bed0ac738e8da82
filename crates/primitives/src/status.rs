use serde::{Deserialize, Serialize};

/// Where a validator stands with respect to the pool.
///
/// `Untracked` is the implicit state of every validator the oracle has never
/// seen; a record only exists once a subscription or a proposal is observed.
/// `Banned` is terminal for the finalized event stream: no event other than a
/// governance unban (not part of that stream) leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    Untracked,
    NotSubscribed,
    Active,
    YellowCard,
    RedCard,
    Banned,
}

impl ValidatorStatus {
    /// Whether the validator currently earns a share of incoming rewards.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Active | Self::YellowCard | Self::RedCard)
    }

    /// Applies one state-machine event and returns the resulting status.
    ///
    /// Pure transition table; eligibility checks (collateral bar, sender
    /// identity, beacon-side liveness) happen before an event is fired.
    pub fn advance(self, event: ValidatorEvent) -> Self {
        use ValidatorEvent::*;
        use ValidatorStatus::*;

        match (self, event) {
            (Untracked, ProposalWithCorrectFee) => Active,
            (Untracked, ManualSubscription) => Active,
            (Untracked, _) => Untracked,

            (NotSubscribed, ProposalWithCorrectFee) => Active,
            (NotSubscribed, ManualSubscription) => Active,
            (NotSubscribed, _) => NotSubscribed,

            (Active, ProposalWithWrongFee) => Banned,
            (Active, MissedProposal) => YellowCard,
            (Active, ManualUnsubscription) => NotSubscribed,
            (Active, _) => Active,

            (YellowCard, ProposalWithCorrectFee) => Active,
            (YellowCard, ProposalWithWrongFee) => Banned,
            (YellowCard, MissedProposal) => RedCard,
            (YellowCard, ManualUnsubscription) => NotSubscribed,
            (YellowCard, _) => YellowCard,

            (RedCard, ProposalWithCorrectFee) => YellowCard,
            (RedCard, ProposalWithWrongFee) => Banned,
            (RedCard, ManualUnsubscription) => NotSubscribed,
            (RedCard, _) => RedCard,

            (Banned, UnbanValidator) => Active,
            (Banned, _) => Banned,
        }
    }
}

/// Events that drive the per-validator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorEvent {
    ProposalWithCorrectFee,
    ProposalWithWrongFee,
    MissedProposal,
    UnbanValidator,
    ManualSubscription,
    ManualUnsubscription,
}

#[cfg(test)]
mod tests {
    use super::ValidatorEvent::*;
    use super::ValidatorStatus::*;
    use super::*;

    #[test]
    fn transition_table() {
        let vector = [
            (Active, ProposalWithCorrectFee, Active),
            (Active, ProposalWithWrongFee, Banned),
            (Active, MissedProposal, YellowCard),
            (Active, UnbanValidator, Active),
            (Active, ManualSubscription, Active),
            (Active, ManualUnsubscription, NotSubscribed),
            (YellowCard, ProposalWithCorrectFee, Active),
            (YellowCard, ProposalWithWrongFee, Banned),
            (YellowCard, MissedProposal, RedCard),
            (YellowCard, UnbanValidator, YellowCard),
            (YellowCard, ManualSubscription, YellowCard),
            (YellowCard, ManualUnsubscription, NotSubscribed),
            (RedCard, ProposalWithCorrectFee, YellowCard),
            (RedCard, ProposalWithWrongFee, Banned),
            (RedCard, MissedProposal, RedCard),
            (RedCard, UnbanValidator, RedCard),
            (RedCard, ManualSubscription, RedCard),
            (RedCard, ManualUnsubscription, NotSubscribed),
            (Banned, ProposalWithCorrectFee, Banned),
            (Banned, ProposalWithWrongFee, Banned),
            (Banned, MissedProposal, Banned),
            (Banned, UnbanValidator, Active),
            (Banned, ManualSubscription, Banned),
            (Banned, ManualUnsubscription, Banned),
            (NotSubscribed, ProposalWithCorrectFee, Active),
            (NotSubscribed, ManualSubscription, Active),
            (NotSubscribed, ManualUnsubscription, NotSubscribed),
            (Untracked, ProposalWithCorrectFee, Active),
            (Untracked, ManualSubscription, Active),
            (Untracked, MissedProposal, Untracked),
        ];

        for (from, event, expected) in vector {
            assert_eq!(from.advance(event), expected, "{from:?} + {event:?}");
        }
    }

    #[test]
    fn missed_proposal_chain_recovers() {
        // Active -> YellowCard -> RedCard -> YellowCard -> Active
        let mut status = Active;
        status = status.advance(MissedProposal);
        assert_eq!(status, YellowCard);
        status = status.advance(MissedProposal);
        assert_eq!(status, RedCard);
        status = status.advance(ProposalWithCorrectFee);
        assert_eq!(status, YellowCard);
        status = status.advance(ProposalWithCorrectFee);
        assert_eq!(status, Active);
    }

    #[test]
    fn banned_is_terminal_for_stream_events() {
        for event in [
            ProposalWithCorrectFee,
            ProposalWithWrongFee,
            MissedProposal,
            ManualSubscription,
            ManualUnsubscription,
        ] {
            assert_eq!(Banned.advance(event), Banned);
        }
    }

    #[test]
    fn subscribed_statuses() {
        assert!(Active.is_subscribed());
        assert!(YellowCard.is_subscribed());
        assert!(RedCard.is_subscribed());
        assert!(!NotSubscribed.is_subscribed());
        assert!(!Banned.is_subscribed());
        assert!(!Untracked.is_subscribed());
    }
}
