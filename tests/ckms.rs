mod integration {
    mod ckms {
        use ckms_stream::ckms::{Quantile, CKMS};
        use ckms_stream::Config;
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        fn quantiles() -> Vec<Quantile> {
            vec![
                Quantile::new(0.5, 0.1).unwrap(),
                Quantile::new(0.9, 0.01).unwrap(),
                Quantile::new(0.99, 0.001).unwrap(),
            ]
        }

        // The order statistic at 1-indexed rank k of the sorted data.
        fn nth(data: &[f64], k: usize) -> f64 {
            data[k - 1]
        }

        #[test]
        fn test_ascending_scenario() {
            let mut ckms = CKMS::<u32>::new(&quantiles()).unwrap();
            for i in 1..1000 {
                ckms.insert(i);
            }

            let median = ckms.query(0.5).unwrap();
            assert!((400..=600).contains(&median), "median: {}", median);
            let p99 = ckms.query(0.99).unwrap();
            assert!((980..=999).contains(&p99), "p99: {}", p99);
        }

        #[test]
        fn test_targeted_bounds_random() {
            let mut rng = StdRng::seed_from_u64(1972);
            let config = Config::default()
                .with_buffer_capacity(500)
                .with_quantiles(&quantiles());
            let mut ckms = CKMS::<f64>::with_config(&config).unwrap();

            for _round in 0..2 {
                let mut data: Vec<f64> = (0..5_000).map(|_| rng.gen_range(0.0..1_000.0)).collect();
                for d in &data {
                    ckms.insert(*d);
                }
                data.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let n = data.len();

                for q in quantiles() {
                    let lower = (((q.quantile() - q.error()) * n as f64).floor() as usize).max(1);
                    let upper = (((q.quantile() + q.error()) * n as f64).ceil() as usize).min(n);
                    let v = ckms.query(q.quantile()).unwrap();
                    assert!(
                        nth(&data, lower) <= v && v <= nth(&data, upper),
                        "{}: {} not in [{}, {}]",
                        q,
                        v,
                        nth(&data, lower),
                        nth(&data, upper)
                    );
                }
                ckms.reset();
            }
        }

        #[test]
        fn test_memory_is_bounded() {
            let mut rng = StdRng::seed_from_u64(42);
            let mut ckms = CKMS::<u32>::default();
            for _ in 0..100_000 {
                ckms.insert(rng.gen_range(0..1_000_000));
            }
            ckms.flush();

            assert_eq!(100_000, ckms.count());
            assert!(ckms.len() < 10_000, "stored {} samples", ckms.len());
        }
    }
}
