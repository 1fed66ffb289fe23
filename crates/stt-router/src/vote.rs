use tracing::info;

/// One language's running vote count. Entries keep first-seen order because
/// ties within a partition break by insertion order.
#[derive(Debug, Clone)]
pub struct TallyEntry {
    pub language: String,
    pub is_regional: bool,
    pub votes: u32,
}

/// Per-session routing state.
///
/// A session starts in `Detecting` and transitions to `Locked` exactly once,
/// when the vote count reaches the quorum. `Locked` carries no tally, so
/// voting after lock is unrepresentable.
#[derive(Debug, Clone)]
pub enum RoutingState {
    Detecting {
        tally: Vec<TallyEntry>,
        detections: usize,
    },
    Locked {
        language: String,
        use_regional: bool,
    },
}

impl RoutingState {
    pub fn new() -> Self {
        Self::Detecting {
            tally: Vec::new(),
            detections: 0,
        }
    }

    /// Creates a state locked from the start (fixed-language override mode).
    pub fn locked(language: String, use_regional: bool) -> Self {
        Self::Locked {
            language,
            use_regional,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    pub fn locked_language(&self) -> Option<&str> {
        match self {
            Self::Locked { language, .. } => Some(language),
            Self::Detecting { .. } => None,
        }
    }

    pub fn uses_regional_backend(&self) -> bool {
        matches!(
            self,
            Self::Locked {
                use_regional: true,
                ..
            }
        )
    }

    /// Records one detection vote. If this vote brings the count to the
    /// quorum, resolves the majority and transitions to `Locked`.
    ///
    /// A vote against an already locked state is a no-op: the lock is
    /// permanent for the session's lifetime.
    pub fn record_vote(&mut self, language: &str, is_regional: bool, quorum: usize) {
        let Self::Detecting { tally, detections } = self else {
            return;
        };

        match tally.iter_mut().find(|e| e.language == language) {
            Some(entry) => entry.votes += 1,
            None => tally.push(TallyEntry {
                language: language.to_string(),
                is_regional,
                votes: 1,
            }),
        }
        *detections += 1;

        if *detections >= quorum {
            let (language, use_regional) = resolve_majority(tally);
            info!(
                language = %language,
                use_regional,
                detections = *detections,
                "Language locked by majority vote"
            );
            *self = Self::Locked {
                language,
                use_regional,
            };
        }
    }
}

impl Default for RoutingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the majority vote, preferring regional languages on ties.
///
/// The regional partition wins whenever its best count is >= the general
/// partition's best count; ties within a partition break by first-seen
/// order, which the tally vector already encodes.
fn resolve_majority(tally: &[TallyEntry]) -> (String, bool) {
    let best_regional = first_seen_max(tally.iter().filter(|e| e.is_regional));
    let best_general = first_seen_max(tally.iter().filter(|e| !e.is_regional));

    let max_regional = best_regional.map(|e| e.votes).unwrap_or(0);
    let max_general = best_general.map(|e| e.votes).unwrap_or(0);

    if let Some(entry) = best_regional {
        if max_regional >= max_general {
            return (entry.language.clone(), true);
        }
    }
    if let Some(entry) = best_general {
        return (entry.language.clone(), false);
    }

    // Should not happen once quorum is reached, but handle an empty-partition
    // tally by taking the overall most-voted entry.
    match first_seen_max(tally.iter()) {
        Some(entry) => (entry.language.clone(), entry.is_regional),
        None => (String::new(), false),
    }
}

/// Highest-vote entry; on equal counts the earlier (first-seen) entry wins.
///
/// `Iterator::max_by_key` keeps the last of equal elements, which would
/// invert the tie-break, so scan with a strictly-greater comparison instead.
fn first_seen_max<'a>(entries: impl Iterator<Item = &'a TallyEntry>) -> Option<&'a TallyEntry> {
    let mut best: Option<&TallyEntry> = None;
    for entry in entries {
        if best.is_none_or(|b| entry.votes > b.votes) {
            best = Some(entry);
        }
    }
    best
}
