//! Per-slot transition log with episode boundaries.
use crate::Transition;
use serde::{Deserialize, Serialize};

/// How [`TransitionList::to_trajectories`] treats a final window shorter than
/// `unroll_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TrajectoryTail {
    /// Discards the short window.
    Drop,

    /// Fills the short window up to `unroll_len` with null copies of its last
    /// transition, see [`Transition::null_padding`].
    Pad,
}

/// Fixed-length trajectory windows of all slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectories<T> {
    /// Windows of all slots, slot 0 first.
    pub windows: Vec<Vec<T>>,

    /// `end_idx[env_id]` is the exclusive end of the windows of slot `env_id` in
    /// `windows`, one past its last window rather than the index of that window. Slot
    /// `env_id` owns `windows[end_idx[env_id - 1]..end_idx[env_id]]`, with `0` as the
    /// start of slot 0, and an empty slot repeats the previous end.
    pub end_idx: Vec<usize>,
}

impl<T> Trajectories<T> {
    /// The total number of transitions in all windows.
    pub fn n_transitions(&self) -> usize {
        self.windows.iter().map(|w| w.len()).sum()
    }
}

/// Ordered log of transitions of each slot with episode-done markers.
///
/// [`TransitionList::to_trajectories`] and [`TransitionList::to_episodes`] are two
/// views of the same log; neither modifies it. Call [`TransitionList::clear`] once the
/// data has been handed off.
#[derive(Debug, Clone)]
pub struct TransitionList<O, Out, I> {
    transitions: Vec<Vec<Transition<O, Out, I>>>,
    done_idx: Vec<Vec<usize>>,
}

impl<O, Out, I> TransitionList<O, Out, I>
where
    O: Clone,
    Out: Clone,
    I: Clone,
{
    /// Creates an empty list for `env_num` slots.
    pub fn new(env_num: usize) -> Self {
        Self {
            transitions: (0..env_num).map(|_| Vec::new()).collect(),
            done_idx: (0..env_num).map(|_| Vec::new()).collect(),
        }
    }

    /// Appends a transition to the log of slot `env_id`.
    ///
    /// Panics if `env_id` is out of range.
    pub fn append(&mut self, env_id: usize, transition: Transition<O, Out, I>) {
        let done = transition.done;
        self.transitions[env_id].push(transition);
        if done {
            self.done_idx[env_id].push(self.transitions[env_id].len());
        }
    }

    /// Splits the log of each slot into windows of `unroll_len` transitions.
    ///
    /// With `split_at_done`, each episode (and the unfinished tail of a slot) is split
    /// separately so that no window spans two episodes. The final short window of each
    /// split is handled according to `tail`.
    ///
    /// Panics if `unroll_len == 0`.
    pub fn to_trajectories(
        &self,
        unroll_len: usize,
        tail: TrajectoryTail,
        split_at_done: bool,
    ) -> Trajectories<Transition<O, Out, I>> {
        assert!(unroll_len > 0, "unroll_len must be positive");
        let mut windows = Vec::new();
        let mut end_idx = Vec::with_capacity(self.transitions.len());

        for (env_id, transitions) in self.transitions.iter().enumerate() {
            let segments: Vec<&[Transition<O, Out, I>]> = if split_at_done {
                self.segments(env_id)
            } else {
                vec![transitions.as_slice()]
            };

            for segment in segments {
                for chunk in segment.chunks(unroll_len) {
                    if chunk.len() == unroll_len {
                        windows.push(chunk.to_vec());
                    } else if tail == TrajectoryTail::Pad {
                        let mut window = chunk.to_vec();
                        let null = chunk[chunk.len() - 1].null_padding();
                        window.resize(unroll_len, null);
                        windows.push(window);
                    }
                }
            }
            end_idx.push(windows.len());
        }

        Trajectories { windows, end_idx }
    }

    /// Returns the completed episodes of all slots, slot 0 first.
    ///
    /// Transitions after the last done marker of a slot belong to an unfinished episode
    /// and are not returned.
    pub fn to_episodes(&self) -> Vec<Vec<Transition<O, Out, I>>> {
        let mut episodes = Vec::new();
        for (transitions, done_idx) in self.transitions.iter().zip(self.done_idx.iter()) {
            let mut last = 0;
            for &ix in done_idx.iter() {
                episodes.push(transitions[last..ix].to_vec());
                last = ix;
            }
        }
        episodes
    }

    /// Removes all transitions and markers.
    pub fn clear(&mut self) {
        self.transitions.iter_mut().for_each(|t| t.clear());
        self.done_idx.iter_mut().for_each(|d| d.clear());
    }

    /// Removes the completed episodes, keeping the unfinished tail of each slot.
    pub fn clear_finished(&mut self) {
        for (transitions, done_idx) in self.transitions.iter_mut().zip(self.done_idx.iter_mut()) {
            if let Some(&last) = done_idx.last() {
                transitions.drain(..last);
            }
            done_idx.clear();
        }
    }

    /// The number of transitions of slot `env_id`.
    pub fn slot_len(&self, env_id: usize) -> usize {
        self.transitions[env_id].len()
    }

    /// The total number of transitions.
    pub fn len(&self) -> usize {
        self.transitions.iter().map(|t| t.len()).sum()
    }

    /// Returns `true` if no transition is logged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of slots.
    pub fn env_num(&self) -> usize {
        self.transitions.len()
    }

    // Episodes of a slot followed by its unfinished tail, if any.
    fn segments(&self, env_id: usize) -> Vec<&[Transition<O, Out, I>]> {
        let transitions = &self.transitions[env_id];
        let mut segments = Vec::new();
        let mut last = 0;
        for &ix in self.done_idx[env_id].iter() {
            segments.push(&transitions[last..ix]);
            last = ix;
        }
        if last < transitions.len() {
            segments.push(&transitions[last..]);
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestep;

    type Tr = Transition<usize, usize, ()>;

    fn transition(step: usize, done: bool) -> Tr {
        Transition::new(&step, &0, &Timestep::new(step + 1, 1.0, done, ()))
    }

    // Slot 0: episodes of length 3 and 2, then 2 transitions of an unfinished episode.
    // Slot 1: 4 transitions without episode end.
    fn list() -> TransitionList<usize, usize, ()> {
        let mut list = TransitionList::new(3);
        for (i, done) in [false, false, true, false, true, false, false].iter().enumerate() {
            list.append(0, transition(i, *done));
        }
        (0..4).for_each(|i| list.append(1, transition(i, false)));
        list
    }

    #[test]
    fn test_to_trajectories_drop() {
        let list = list();
        let trajs = list.to_trajectories(2, TrajectoryTail::Drop, false);

        // floor(n / u) * u per slot
        assert_eq!(trajs.n_transitions(), 6 + 4);
        assert_eq!(trajs.end_idx, vec![3, 5, 5]);
        assert!(trajs.windows.iter().all(|w| w.len() == 2));
        assert_eq!(trajs.windows[1][0].obs, 2);
        assert_eq!(trajs.windows[3][0].obs, 0);
    }

    #[test]
    fn test_to_trajectories_pad() {
        let list = list();
        let trajs = list.to_trajectories(3, TrajectoryTail::Pad, false);
        assert_eq!(trajs.end_idx, vec![3, 5, 5]);

        let last = &trajs.windows[2];
        assert_eq!(last.len(), 3);
        assert!(!last[0].is_null);
        assert!(last[1].is_null && last[2].is_null);
        assert_eq!(last[1].obs, 6);
        assert_eq!(
            trajs.windows.iter().flatten().filter(|t| !t.is_null).count(),
            list.len()
        );
    }

    #[test]
    fn test_to_trajectories_split_at_done() {
        let list = list();
        let trajs = list.to_trajectories(2, TrajectoryTail::Drop, true);

        // Slot 0 segments have lengths 3, 2, 2
        assert_eq!(trajs.end_idx, vec![3, 5, 5]);
        for w in trajs.windows.iter() {
            let ids: Vec<_> = w.iter().map(|t| t.obs).collect();
            assert!(w[..w.len() - 1].iter().all(|t| !t.done), "{:?}", ids);
        }
        assert_eq!(trajs.windows[1][0].obs, 3);
    }

    #[test]
    fn test_to_episodes() {
        let mut list = list();
        let episodes = list.to_episodes();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].len(), 3);
        assert_eq!(episodes[1].len(), 2);
        assert!(episodes.iter().all(|e| e.last().unwrap().done));

        // Non-destructive
        assert_eq!(list.len(), 11);
        assert_eq!(list.to_episodes(), episodes);

        list.clear();
        assert!(list.is_empty());
        assert!(list.to_episodes().is_empty());
        assert_eq!(list.env_num(), 3);
    }

    #[test]
    fn test_to_episodes_conserves_transitions() {
        let mut list = TransitionList::new(2);
        for i in 0..12 {
            list.append(i % 2, transition(i, i % 3 == 2 || i == 11 || i == 10));
        }
        let episodes = list.to_episodes();
        assert_eq!(episodes.iter().map(|e| e.len()).sum::<usize>(), list.len());
    }

    #[test]
    fn test_clear_finished() {
        let mut list = list();
        list.clear_finished();
        assert_eq!(list.slot_len(0), 2);
        assert_eq!(list.slot_len(1), 4);
        assert!(list.to_episodes().is_empty());

        list.append(0, transition(7, true));
        let episodes = list.to_episodes();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].iter().map(|t| t.obs).collect::<Vec<_>>(), vec![5, 6, 7]);
    }
}
