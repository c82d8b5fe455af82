#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use crate::aggregate::{Configuration, ConfigurationResult, FailureTally, aggregate_runs};
    use crate::error::HarnessError;
    use crate::runner::RunOutcome;
    use crate::testing::{ScriptedLauncher, failure, success, timeout};

    const EXE: &str = "./workload";
    const LIMIT: Duration = Duration::from_secs(300);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_configuration_rejects_zero() {
        assert!(matches!(
            Configuration::new(0, 3),
            Err(HarnessError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Configuration::new(2, 0),
            Err(HarnessError::InvalidConfiguration(_))
        ));
        let config = Configuration::new(4, 3).expect("valid configuration");
        assert_eq!((config.process_count(), config.run_count()), (4, 3));
    }

    #[test]
    fn test_all_successes_reduce_to_mean_min_max() {
        let mut launcher = ScriptedLauncher::new().with(2, [success(4.0), success(6.0), success(5.0)]);
        let config = Configuration::new(2, 3).expect("valid configuration");
        let result = aggregate_runs(&mut launcher, Path::new(EXE), config, LIMIT);

        assert_eq!(launcher.calls(), &[2, 2, 2]);
        assert_eq!(result.process_count(), 2);
        assert_eq!(result.successful_runs(), 3);
        assert_eq!(result.raw_times(), &[4.0, 6.0, 5.0]);
        assert!(approx(result.avg_time().expect("avg"), 5.0));
        assert_eq!(result.min_time(), Some(4.0));
        assert_eq!(result.max_time(), Some(6.0));
        assert_eq!(result.failures(), FailureTally::default());
    }

    #[test]
    fn test_failures_do_not_abort_remaining_attempts() {
        let mut launcher = ScriptedLauncher::new().with(
            4,
            [
                timeout(),
                success(3.0),
                failure("segfault"),
                RunOutcome::LaunchError {
                    cause: "mpirun missing".to_string(),
                },
                success(2.0),
            ],
        );
        let config = Configuration::new(4, 5).expect("valid configuration");
        let result = aggregate_runs(&mut launcher, Path::new(EXE), config, LIMIT);

        assert_eq!(launcher.calls().len(), 5);
        assert_eq!(result.successful_runs(), 2);
        assert_eq!(result.raw_times(), &[3.0, 2.0]);
        assert!(approx(result.avg_time().expect("avg"), 2.5));
        let tally = result.failures();
        assert_eq!((tally.timeouts, tally.process_failures, tally.launch_errors), (1, 1, 1));
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_total_failure_has_no_statistics() {
        let mut launcher = ScriptedLauncher::new().with(1, [timeout(), timeout()]);
        let config = Configuration::new(1, 2).expect("valid configuration");
        let result = aggregate_runs(&mut launcher, Path::new(EXE), config, LIMIT);

        assert!(result.is_failed());
        assert_eq!(result.successful_runs(), 0);
        assert!(result.raw_times().is_empty());
        assert_eq!(result.avg_time(), None);
        assert_eq!(result.min_time(), None);
        assert_eq!(result.max_time(), None);
        assert_eq!(result.failures().timeouts, 2);
    }

    #[test]
    fn test_mean_stays_within_extremes() {
        let times = vec![0.1, 0.1, 0.1];
        let result = ConfigurationResult::from_times(8, times.clone());
        let avg = result.avg_time().expect("avg");
        let min = result.min_time().expect("min");
        let max = result.max_time().expect("max");
        assert!(min <= avg && avg <= max);
        assert!((avg - times.iter().sum::<f64>() / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_recomputes_from_raw_times() {
        let json = r#"{"process_count": 2, "successful_runs": 99, "avg_time": 1.0, "raw_times": [2.0, 4.0]}"#;
        let result: ConfigurationResult = serde_json::from_str(json).expect("parse result");
        assert_eq!(result.successful_runs(), 2);
        assert!(approx(result.avg_time().expect("avg"), 3.0));
        assert_eq!(result.max_time(), Some(4.0));

        let round_trip: ConfigurationResult =
            serde_json::from_str(&serde_json::to_string(&result).expect("serialize")).expect("parse");
        assert_eq!(round_trip, result);
    }
}
