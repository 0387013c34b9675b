use crate::evaluator::Evaluator;
use crate::partition::WorkRange;
use crossbeam_channel::Sender;
use crossbeam_utils::sync::WaitGroup;
use std::sync::Arc;

/// The sum of `f(a + i*h)` over one task's range, tagged with the task index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PartialSum {
    pub(crate) task: usize,
    pub(crate) value: f64,
}

/// Everything one task needs, moved by value into the job that runs it.
///
/// The accumulator lives on the executing worker's stack inside
/// [`PartialSumTask::run`]; nothing is shared with sibling tasks except the
/// read-only evaluator.
pub(crate) struct PartialSumTask<E> {
    pub(crate) task: usize,
    pub(crate) range: WorkRange,
    pub(crate) a: f64,
    pub(crate) h: f64,
    pub(crate) evaluator: Arc<E>,
    pub(crate) results: Sender<PartialSum>,
    /// Released when the task is dropped, whether it finished or unwound.
    pub(crate) done: WaitGroup,
}

impl<E: Evaluator> PartialSumTask<E> {
    pub(crate) fn run(self) {
        let value: f64 = self
            .range
            .indices()
            .map(|i| self.evaluator.evaluate(self.a + i as f64 * self.h))
            .sum();

        // The channel holds one slot per task, so this never blocks. It only
        // fails if the collector already gave up, and then nobody needs the
        // value.
        let _ = self.results.send(PartialSum {
            task: self.task,
            value,
        });
        drop(self.done);
    }
}
