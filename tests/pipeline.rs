use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

use sassign::{
    AccessionConfig, AccessionTable, BucketContents, ConstraintConfig, JoinMissPolicy,
    ScheduleError, ScheduleMode, Scheduler, SchedulerConfig,
};

const ASSEMBLY_TABLE: &str = "#assembly_accession,species_taxid\n\
GCF_000000001.1,X\n\
GCF_000000002.1,Y\n\
GCF_000000003.1,X\n\
GCF_000000004.1,Z\n\
GCF_000000005.1,Y\n";

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b">contig\nACGT\n").unwrap();
}

fn write_gz_table(path: &Path, body: &str) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn base_config(root: &Path, out: &Path, buckets: usize) -> SchedulerConfig {
    SchedulerConfig {
        root: root.to_path_buf(),
        total_buckets: buckets,
        output_dir: out.to_path_buf(),
        accession: AccessionConfig {
            enabled: false,
            ..AccessionConfig::default()
        },
        ..SchedulerConfig::default()
    }
}

fn bucket_files(bucket: &BucketContents) -> Vec<String> {
    bucket.paths().into_iter().cloned().collect()
}

#[test]
fn flat_schedule_covers_every_file_exactly_once() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    for idx in 0..23 {
        touch(data.path(), &format!("genome_{idx:02}.fna"));
    }
    touch(data.path(), "readme.txt");

    let config = SchedulerConfig {
        shuffle: true,
        seed: Some(11),
        ..base_config(data.path(), out.path(), 5)
    };
    let outcome = Scheduler::new(config).unwrap().run().unwrap();
    assert_eq!(outcome.mode, ScheduleMode::Flat);

    let mut seen = HashSet::new();
    let mut sizes = Vec::new();
    for bucket in outcome.schedule.buckets.values() {
        let files = bucket_files(bucket);
        sizes.push(files.len());
        for file in files {
            assert!(seen.insert(file), "file assigned twice");
        }
    }
    assert_eq!(seen.len(), 23);
    assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
    let stats = outcome.stats.unwrap();
    assert_eq!(stats.item_spread(), 1);

    let persisted = sassign::Schedule::read_buckets(outcome.schedule.location.unwrap()).unwrap();
    assert_eq!(persisted.len(), 5);
}

#[test]
fn ending_constraint_keeps_only_matching_stems() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    touch(data.path(), "a_R1.fna");
    touch(data.path(), "a_R2.fna");

    let config = SchedulerConfig {
        constraints: ConstraintConfig {
            ending: Some("_R1".to_string()),
            ..ConstraintConfig::default()
        },
        save: false,
        ..base_config(data.path(), out.path(), 1)
    };
    let outcome = Scheduler::new(config).unwrap().run().unwrap();
    let files = bucket_files(&outcome.schedule.buckets[0]);
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("a_R1.fna"));
}

#[test]
fn maxdepth_and_parent_constraint_limit_discovery() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    touch(data.path(), "top.fna");
    touch(data.path(), "bacteria/b1.fna");
    touch(data.path(), "viral/v1.fna");
    touch(data.path(), "bacteria/deep/bacteria/b2.fna");

    let shallow = SchedulerConfig {
        maxdepth: 2,
        save: false,
        constraints: ConstraintConfig {
            parent: Some(vec!["bacteria".to_string()]),
            ..ConstraintConfig::default()
        },
        ..base_config(data.path(), out.path(), 1)
    };
    let outcome = Scheduler::new(shallow.clone()).unwrap().run().unwrap();
    assert_eq!(outcome.detected_files, 1);

    let deep = SchedulerConfig {
        maxdepth: 4,
        ..shallow
    };
    let outcome = Scheduler::new(deep).unwrap().run().unwrap();
    assert_eq!(outcome.detected_files, 2);
}

#[test]
fn insufficient_files_abort_without_writing() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    touch(data.path(), "a.fna");
    touch(data.path(), "b.fna");

    let err = Scheduler::new(base_config(data.path(), out.path(), 3))
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::InsufficientItems {
            found: 2,
            buckets: 3
        }
    ));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn grouped_schedule_never_splits_a_group() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    let table_path = data.path().join("assembly.txt.gz");
    write_gz_table(&table_path, ASSEMBLY_TABLE);
    for name in [
        "GCF_000000001.1_alpha_genomic.fna",
        "GCF_000000002.1_beta_genomic.fna",
        "GCF_000000003.1_gamma_genomic.fna",
        "GCF_000000004.1_delta_genomic.fna",
        "GCF_000000005.1_eps_genomic.fna",
        "GCF_000000009.1_unknown_genomic.fna",
        "no_accession.fna",
    ] {
        touch(data.path(), &format!("genomes/{name}"));
    }

    let config = SchedulerConfig {
        root: data.path().join("genomes"),
        accession: AccessionConfig {
            table_path: table_path.clone(),
            ..AccessionConfig::default()
        },
        ..base_config(data.path(), out.path(), 2)
    };
    let outcome = Scheduler::new(config.clone()).unwrap().run().unwrap();
    assert_eq!(outcome.mode, ScheduleMode::Grouped);
    assert_eq!(outcome.detected_files, 7);
    assert_eq!(outcome.join_misses.len(), 2);

    let mut owner = std::collections::HashMap::new();
    for (idx, bucket) in &outcome.schedule.buckets {
        let BucketContents::Grouped(groups) = bucket else {
            panic!("expected grouped bucket");
        };
        for key in groups.keys() {
            assert!(owner.insert(key.clone(), *idx).is_none(), "group {key} split");
        }
    }
    let mut keys: Vec<&String> = owner.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["X", "Y", "Z"]);
    assert_eq!(owner["X"], 0);
    assert_eq!(owner["Y"], 0);
    assert_eq!(owner["Z"], 1);
    assert_eq!(outcome.schedule.file_count(), 5);

    let unassigned = SchedulerConfig {
        accession: AccessionConfig {
            table_path,
            miss_policy: JoinMissPolicy::Unassigned,
            ..AccessionConfig::default()
        },
        save: false,
        ..config
    };
    let outcome = Scheduler::new(unassigned).unwrap().run().unwrap();
    assert_eq!(outcome.schedule.file_count(), 7);
}

#[test]
fn missing_table_falls_back_to_flat_mode() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    touch(data.path(), "GCF_000000001.1_alpha_genomic.fna");
    let config = SchedulerConfig {
        accession: AccessionConfig {
            table_path: data.path().join("absent.txt.gz"),
            ..AccessionConfig::default()
        },
        save: false,
        ..base_config(data.path(), out.path(), 1)
    };
    let outcome = Scheduler::new(config).unwrap().run().unwrap();
    assert_eq!(outcome.mode, ScheduleMode::Flat);
    assert!(outcome.join_misses.is_empty());
}

#[test]
fn injected_table_and_rng_give_identical_layouts() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    for idx in 1..=5 {
        touch(data.path(), &format!("GCF_00000000{idx}.1_asm_genomic.fna"));
    }
    let table = AccessionTable::from_pairs(
        (1..=5).map(|idx| (format!("GCF_00000000{idx}.1"), format!("taxon-{idx}"))),
    );
    let config = SchedulerConfig {
        shuffle: true,
        save: false,
        ..base_config(data.path(), out.path(), 2)
    };
    let scheduler = Scheduler::new(config)
        .unwrap()
        .with_accession_table(Some(table));

    let first = scheduler
        .run_with_rng(&mut StdRng::seed_from_u64(3))
        .unwrap();
    let second = scheduler
        .run_with_rng(&mut StdRng::seed_from_u64(3))
        .unwrap();
    assert_eq!(first.mode, ScheduleMode::Grouped);
    assert_eq!(first.schedule.buckets, second.schedule.buckets);
    let item_counts: Vec<usize> = first
        .schedule
        .buckets
        .values()
        .map(BucketContents::item_count)
        .collect();
    assert_eq!(item_counts, vec![3, 2]);
}
