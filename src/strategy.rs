use std::io;
use std::thread;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

const WORKER_NAME: &str = "thread_promise-worker";

/// How a promise's computation gets run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// On a freshly spawned thread; construction returns immediately.
    #[default]
    Asynchronous,
    /// Inline on the calling thread, finished before construction returns.
    Synchronous,
}

impl Strategy {
    pub(crate) fn run(self, job: Job) -> io::Result<()> {
        match self {
            Strategy::Asynchronous => {
                thread::Builder::new()
                    .name(WORKER_NAME.to_owned())
                    .spawn(job)?;
                Ok(())
            }
            Strategy::Synchronous => {
                job();
                Ok(())
            }
        }
    }
}
