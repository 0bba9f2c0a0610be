#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::mpsc::{channel, Receiver};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use thread_promise::{promise, run, spawn, when, Error, Failure, Promise, Status, Strategy};

    /// A promise that resolves with `value` once `gate` receives.
    fn gated<T: Send + Sync + 'static>(gate: Receiver<()>, value: T) -> Promise<T> {
        spawn(move || {
            gate.recv().ok();
            Ok::<_, Failure>(value)
        })
    }

    fn gated_failure(gate: Receiver<()>, failure: Failure) -> Promise<i32> {
        spawn(move || {
            gate.recv().ok();
            Err::<i32, _>(failure)
        })
    }

    #[test]
    fn test_promise_resolve() {
        let (tx, rx) = channel();
        let promise = gated(rx, String::from("🍓"));
        assert_eq!(promise.status(), Status::Pending);
        assert!(!promise.is_finished());
        assert!(matches!(promise.result(), Err(Error::NotFinished)));
        tx.send(()).unwrap();
        promise.wait();
        assert_eq!(promise.status(), Status::Resolved);
        assert_eq!(promise.result().unwrap(), "🍓");
    }

    #[test]
    fn test_synchronous_settles_before_return() {
        let promise = promise(Strategy::Synchronous, || Ok::<_, Failure>(7));
        assert!(promise.is_finished());
        assert_eq!(promise.result().unwrap(), 7);
    }

    #[test]
    fn test_uncaught_failure_keeps_identity() {
        let failure = Failure::new(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let promise = run({
            let failure = failure.clone();
            move || Err::<i32, _>(failure)
        });
        assert_eq!(promise.status(), Status::Rejected);
        assert!(promise.throw_uncaught().unwrap_err().ptr_eq(&failure));
        match promise.result() {
            Err(Error::Failed(raised)) => assert!(raised.ptr_eq(&failure)),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_matching_catch_absorbs() {
        let seen = Arc::new(Mutex::new(None));
        let promise = run(|| Err::<i32, _>(io::Error::new(io::ErrorKind::Other, "boom")));
        let sink = seen.clone();
        promise.catch(move |err: &io::Error| *sink.lock().unwrap() = Some(err.to_string()));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("boom"));
        assert!(promise.throw_uncaught().is_ok());
        assert!(matches!(promise.result(), Err(Error::Rejected)));
    }

    #[test]
    fn test_mismatched_catch_passes_through() {
        let promise = run(|| Err::<i32, _>(io::Error::new(io::ErrorKind::Other, "boom")));
        promise.catch(|_: &std::fmt::Error| panic!("wrong handler ran"));
        assert!(promise.throw_uncaught().is_err());
        // a later matching handler still gets its turn
        promise.catch(|_: &io::Error| {});
        assert!(promise.throw_uncaught().is_ok());
    }

    #[test]
    fn test_catch_registration_order_independent() {
        fn observe(before: bool) -> (Vec<String>, bool) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let (tx, rx) = channel();
            let promise = gated_failure(rx, Failure::msg("late"));
            let register = |promise: &Promise<i32>| {
                let sink = seen.clone();
                promise.catch_any(move |failure| {
                    sink.lock().unwrap().push(failure.to_string());
                    true
                });
            };
            if before {
                register(&promise);
            }
            tx.send(()).unwrap();
            promise.wait();
            if !before {
                register(&promise);
            }
            let seen = seen.lock().unwrap().clone();
            (seen, promise.throw_uncaught().is_ok())
        }
        assert_eq!(observe(true), observe(false));
        assert_eq!(observe(true), (vec![String::from("late")], true));
    }

    #[test]
    fn test_always_runs_once_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = channel();
        let promise = gated(rx, 1);
        for i in 0..3 {
            let order = order.clone();
            promise.always(move || order.lock().unwrap().push(i));
        }
        tx.send(()).unwrap();
        promise.wait();
        // settled: runs inline, or right after the queued ones on the worker
        let (done_tx, done_rx) = channel();
        let late = order.clone();
        promise.always(move || {
            late.lock().unwrap().push(3);
            done_tx.send(()).unwrap();
        });
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_always_on_rejection() {
        let (tx, rx) = channel();
        run(|| Err::<(), _>(Failure::msg("x"))).always(move || tx.send(()).unwrap());
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn test_then_runs_with_value() {
        let (tx, rx) = channel();
        let upstream = gated(rx, 20);
        let next = upstream.then(|n| n + 1).then(|n| n * 2);
        assert_eq!(next.status(), Status::Pending);
        tx.send(()).unwrap();
        assert_eq!(next.get().unwrap(), 42);
    }

    #[test]
    fn test_then_on_settled_runs_inline() {
        let upstream = run(|| Ok::<_, Failure>("a"));
        let next = upstream.then(|s| format!("{}b", s));
        assert!(next.is_finished());
        assert_eq!(next.result().unwrap(), "ab");
    }

    #[test]
    fn test_rejection_skips_successor_computation() {
        let ran = Arc::new(Mutex::new(false));
        let failure = Failure::msg("upstream");
        let (tx, rx) = channel();
        let upstream = gated_failure(rx, failure.clone());
        let flag = ran.clone();
        let next = upstream.then(move |n| {
            *flag.lock().unwrap() = true;
            n
        });
        tx.send(()).unwrap();
        next.wait();
        assert_eq!(next.status(), Status::Rejected);
        assert!(next.throw_uncaught().unwrap_err().ptr_eq(&failure));
        assert!(!*ran.lock().unwrap());
    }

    #[test]
    fn test_absorbed_rejection_reaches_successor_empty() {
        let (tx, rx) = channel();
        let upstream = gated_failure(rx, Failure::msg("handled"));
        upstream.catch_any(|_| true);
        let next = upstream.then(|n| n);
        tx.send(()).unwrap();
        next.wait();
        assert_eq!(next.status(), Status::Rejected);
        assert!(next.throw_uncaught().is_ok());
        assert!(matches!(next.result(), Err(Error::Rejected)));
    }

    #[test]
    fn test_and_then_failure() {
        let next = run(|| Ok::<_, Failure>("x")).and_then(|s| s.parse::<i32>());
        assert_eq!(next.status(), Status::Rejected);
        assert!(next
            .throw_uncaught()
            .unwrap_err()
            .is::<std::num::ParseIntError>());
    }

    #[test]
    fn test_chain_deferred() {
        let (tx, rx) = channel();
        let upstream = gated(rx, ());
        let next = upstream.chain(Promise::deferred(Strategy::Asynchronous, || {
            Ok::<_, Failure>(thread::current().name().map(str::to_owned))
        }));
        assert_eq!(next.status(), Status::Pending);
        tx.send(()).unwrap();
        assert_eq!(next.get().unwrap().as_deref(), Some("thread_promise-worker"));
    }

    #[test]
    fn test_when_success() {
        let f1 = spawn(|| Ok::<_, Failure>(2));
        let f2 = spawn(|| Ok::<_, Failure>(3));
        assert_eq!(when((f1, f2), |(a, b)| a + b).get().unwrap(), 5);
    }

    #[test]
    fn test_when_short_circuits() {
        let combined = Arc::new(Mutex::new(false));
        let failure = Failure::msg("e");
        let f1 = run({
            let failure = failure.clone();
            move || Err::<i32, _>(failure)
        });
        let f2 = spawn(|| Ok::<_, Failure>(1));
        let flag = combined.clone();
        let joined = when((f1, f2), move |(a, b)| {
            *flag.lock().unwrap() = true;
            a + b
        });
        assert!(joined.get().unwrap_err().ptr_eq(&failure));
        assert!(!*combined.lock().unwrap());
    }

    #[test]
    fn test_many_concurrent_resolutions() {
        let promises: Vec<_> = (0..64u64)
            .map(|i| spawn(move || Ok::<_, Failure>(vec![i; 32])))
            .collect();
        let waiters: Vec<_> = promises
            .into_iter()
            .enumerate()
            .map(|(i, promise)| {
                thread::spawn(move || {
                    promise.wait();
                    assert_eq!(promise.status(), Status::Resolved);
                    assert_eq!(promise.result().unwrap(), vec![i as u64; 32]);
                })
            })
            .collect();
        for waiter in waiters {
            waiter.join().expect("The waiter thread has panicked");
        }
    }

    #[test]
    fn test_many_observers_one_promise() {
        let (tx, rx) = channel();
        let promise = gated(rx, 99);
        let observers: Vec<_> = (0..8)
            .map(|_| {
                let promise = promise.clone();
                thread::spawn(move || promise.get().unwrap())
            })
            .collect();
        tx.send(()).unwrap();
        for observer in observers {
            assert_eq!(observer.join().expect("The observer thread has panicked"), 99);
        }
    }

    #[test]
    fn test_settled_future() {
        let (tx, rx) = channel();
        let promise = gated(rx, String::from("hi"));
        let task1 = {
            let promise = promise.clone();
            thread::spawn(move || block_on(promise.settled()))
        };
        let task2 = thread::spawn(move || block_on(promise.settled()));
        tx.send(()).unwrap();
        assert_eq!(task1.join().expect("The task1 thread has panicked").unwrap(), "hi");
        assert_eq!(task2.join().expect("The task2 thread has panicked").unwrap(), "hi");
    }

    #[test]
    fn test_settled_future_rejected() {
        let promise = run(|| Err::<i32, _>(Failure::msg("no")));
        match block_on(promise.settled()) {
            Err(Error::Failed(failure)) => assert_eq!(failure.to_string(), "no"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
