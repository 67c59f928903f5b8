use tls_scan::{batch::BatchPlan, host::Host};

fn hosts(n: usize) -> Vec<Host> {
    (0..n).map(|i| Host::new(format!("h{i}.example"))).collect()
}

#[test]
fn three_hosts_in_pairs() {
    let hs = vec![
        Host::new("a.example"),
        Host::new("b.example"),
        Host::new("c.example"),
    ];
    let plan = BatchPlan::partition(&hs, 2);
    assert_eq!(plan.batches.len(), 2);
    assert_eq!(plan.batches[0].hosts, hs[..2]);
    assert_eq!(plan.batches[1].hosts, hs[2..]);
    assert_eq!(plan.batches[1].index, 1);
}

#[test]
fn partitions_in_order_with_ceiling_count() {
    for n in 0..12 {
        for size in 1..=5 {
            let hs = hosts(n);
            let plan = BatchPlan::partition(&hs, size);

            assert_eq!(plan.batches.len(), n.div_ceil(size));
            let flat: Vec<Host> = plan.batches.iter().flat_map(|b| b.hosts.clone()).collect();
            assert_eq!(flat, hs);

            let (last, rest) = match plan.batches.split_last() {
                Some(parts) => parts,
                None => continue,
            };
            assert!(rest.iter().all(|b| b.len() == size));
            assert!(!last.is_empty() && last.len() <= size);
        }
    }
}

#[test]
fn zero_batch_size_is_treated_as_one() {
    let plan = BatchPlan::partition(&hosts(3), 0);
    assert_eq!(plan.batch_size, 1);
    assert_eq!(plan.batches.len(), 3);
}
