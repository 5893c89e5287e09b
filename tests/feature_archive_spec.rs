mod common;

use common::{specs_path, Corpus};
use specweave_archive::layout::ARCHIVE_RECORD_FILE;
use specweave_archive::models::*;
use specweave_archive::{
    ArchiveError, FeatureArchiverPort, FeatureEpicLifecycleManager, FeatureSync,
    IncrementLifecycleManager, IncrementNumberCache, LinkRewriter,
};
use speculate2::speculate;

fn features(corpus: &Corpus) -> FeatureEpicLifecycleManager {
    FeatureEpicLifecycleManager::new(corpus.layout.clone())
}

fn increments(corpus: &Corpus, options: FeatureArchiveOptions) -> IncrementLifecycleManager {
    IncrementLifecycleManager::new(corpus.layout.clone(), IncrementNumberCache::new())
        .with_cascade(features(corpus), options)
}

fn forced() -> FeatureArchiveOptions {
    FeatureArchiveOptions {
        force_archive_when_all_increments_archived: true,
        ..FeatureArchiveOptions::default()
    }
}

fn only(name: &str) -> ArchiveOptions {
    ArchiveOptions {
        increments: vec![name.to_string()],
        ..ArchiveOptions::default()
    }
}

fn record(corpus: &Corpus, rel: &str) -> ArchiveRecord {
    let content = corpus.read(&specs_path(&format!("{}/{}", rel, ARCHIVE_RECORD_FILE)));
    serde_json::from_str(&content).expect("valid archive record")
}

speculate! {
    before {
        let corpus = Corpus::new();
    }

    describe "cascade from increment archival" {
        before {
            corpus.linked(Zone::Active, "0041-foo", "FS-041");
            corpus.feature(Zone::Active, "FS-041", "Login flow");
            let backend = corpus.shard(Zone::Active, "backend", "FS-041");
            corpus.shard(Zone::Active, "frontend", "FS-041");
            corpus.story(&backend, "us-001.md", "in-progress");
        }

        it "moves the feature and every shard when forced" {
            let result = increments(&corpus, forced()).archive(&only("0041-foo")).expect("archive failed");

            assert!(result.is_archived("0041-foo"));
            assert!(result.cascade_errors.is_empty());
            assert!(corpus.feature_exists(Zone::Archived, "FS-041"));
            assert!(!corpus.feature_exists(Zone::Active, "FS-041"));
            assert!(corpus.root().join(specs_path("backend/_archive/FS-041/us-001.md")).is_file());
            assert!(corpus.root().join(specs_path("frontend/_archive/FS-041/README.md")).is_file());
            assert!(!corpus.root().join(specs_path("backend/FS-041")).exists());
        }

        it "records why the feature was archived" {
            increments(&corpus, forced()).archive(&only("0041-foo")).expect("archive failed");

            let record = record(&corpus, "_features/_archive/FS-041");
            assert_eq!(record.id, "FS-041");
            assert_eq!(record.kind, EntityKind::Feature);
            assert_eq!(record.reason, "all-increments-archived");
            assert_eq!(record.source_path, specs_path("_features/FS-041"));
            assert_eq!(record.linked_increments.len(), 1);
            assert_eq!(record.linked_increments[0].as_str(), "0041-foo");
        }

        it "holds the feature while a shard has open stories" {
            let result = increments(&corpus, FeatureArchiveOptions::default())
                .archive(&only("0041-foo"))
                .expect("archive failed");

            assert!(result.is_archived("0041-foo"));
            assert!(corpus.feature_exists(Zone::Active, "FS-041"));
            assert!(corpus.root().join(specs_path("backend/FS-041")).is_dir());
        }

        it "archives once every story is closed" {
            let backend = corpus.layout.specs_dir().join("backend/FS-041");
            corpus.story(&backend, "us-001.md", "completed");
            corpus.story(&backend, "us-002.md", "cancelled");

            increments(&corpus, FeatureArchiveOptions::default())
                .archive(&only("0041-foo"))
                .expect("archive failed");

            assert!(corpus.feature_exists(Zone::Archived, "FS-041"));
        }

        it "waits for every linked increment" {
            corpus.linked(Zone::Active, "0042-bar", "FS-041");

            increments(&corpus, forced()).archive(&only("0041-foo")).expect("archive failed");

            assert!(corpus.feature_exists(Zone::Active, "FS-041"));
        }

        it "does not cascade on a dry run" {
            let result = increments(&corpus, forced())
                .archive(&ArchiveOptions { dry_run: true, ..only("0041-foo") })
                .expect("archive failed");

            assert!(result.is_archived("0041-foo"));
            assert!(corpus.feature_exists(Zone::Active, "FS-041"));
            assert!(corpus.increment_exists(Zone::Active, "0041-foo"));
        }
    }

    describe "archive_features" {
        it "links increments to features by number when the spec is silent" {
            corpus.completed(Zone::Archived, "0007-untagged");
            corpus.feature(Zone::Active, "FS-007", "Untagged");

            let result = features(&corpus).archive_features(&FeatureArchiveOptions::default()).unwrap();

            assert_eq!(result.archived_features, vec![FeatureId::parse("FS-007").unwrap()]);
        }

        it "prefers the explicit feature link over the number" {
            corpus.linked(Zone::Archived, "0007-tagged", "FS-020");
            corpus.feature(Zone::Active, "FS-007", "Unlinked");
            corpus.feature(Zone::Active, "FS-020", "Linked");

            let result = features(&corpus).archive_features(&FeatureArchiveOptions::default()).unwrap();

            assert!(corpus.feature_exists(Zone::Archived, "FS-020"));
            assert!(corpus.feature_exists(Zone::Active, "FS-007"));
            assert_eq!(result.skipped.len(), 1);
            assert_eq!(result.skipped[0].id, "FS-007");
        }

        it "skips a feature with an active increment" {
            corpus.linked(Zone::Active, "0041-foo", "FS-041");
            corpus.linked(Zone::Archived, "0040-prep", "FS-041");
            corpus.feature(Zone::Active, "FS-041", "");

            let result = features(&corpus).archive_features(&forced()).unwrap();

            assert!(result.archived_features.is_empty());
            assert_eq!(result.skipped[0].reason, "1/2 increments still active");
        }

        describe "orphans" {
            before {
                corpus.feature(Zone::Active, "FS-099", "Nobody links here");
            }

            it "skips orphaned features by default" {
                let result = features(&corpus).archive_features(&FeatureArchiveOptions::default()).unwrap();

                assert!(result.archived_features.is_empty());
                assert!(result.skipped[0].reason.contains("no linked increments"));
                assert!(corpus.feature_exists(Zone::Active, "FS-099"));
            }

            it "archives orphaned features when allowed" {
                let result = features(&corpus)
                    .archive_features(&FeatureArchiveOptions {
                        archive_orphaned_features: true,
                        ..FeatureArchiveOptions::default()
                    })
                    .unwrap();

                assert_eq!(result.archived_features.len(), 1);
                assert_eq!(record(&corpus, "_features/_archive/FS-099").reason, "orphaned");
            }

            it "records a custom reason" {
                features(&corpus)
                    .archive_features(&FeatureArchiveOptions {
                        archive_orphaned_features: true,
                        custom_reason: Some("superseded by FS-100".into()),
                        ..FeatureArchiveOptions::default()
                    })
                    .unwrap();

                assert_eq!(record(&corpus, "_features/_archive/FS-099").reason, "superseded by FS-100");
            }
        }

        describe "uniqueness" {
            before {
                corpus.linked(Zone::Archived, "0041-foo", "FS-041");
                corpus.feature(Zone::Active, "FS-041", "");
            }

            it "refuses a feature already present in the archive" {
                corpus.feature(Zone::Archived, "FS-041", "stale copy");

                let result = features(&corpus).archive_features(&forced()).unwrap();

                assert!(result.archived_features.is_empty());
                assert_eq!(result.errors.len(), 1);
                assert!(result.errors[0].contains("FS-041"));
                assert!(corpus.feature_exists(Zone::Active, "FS-041"));
                assert!(corpus.read(&specs_path("_features/_archive/FS-041/FEATURE.md")).contains("stale copy"));
            }

            it "refuses before moving anything when a shard target is taken" {
                corpus.shard(Zone::Active, "backend", "FS-041");
                corpus.shard(Zone::Archived, "backend", "FS-041");

                let result = features(&corpus).archive_features(&forced()).unwrap();

                assert!(result.archived_features.is_empty());
                assert_eq!(result.errors.len(), 1);
                assert!(corpus.feature_exists(Zone::Active, "FS-041"));
                assert!(corpus.root().join(specs_path("backend/FS-041")).is_dir());
            }
        }

        describe "epics" {
            before {
                corpus.epic(Zone::Active, "EPIC-1");
                corpus.epic(Zone::Active, "EPIC-10");
                corpus.linked(Zone::Archived, "0041-foo", "FS-041");
                corpus.feature(Zone::Active, "FS-041", "epic: EPIC-1");
            }

            it "archives an epic once all its features are archived" {
                let result = features(&corpus).archive_features(&forced()).unwrap();

                assert_eq!(result.archived_epics, vec![EpicId::parse("EPIC-1").unwrap()]);
                assert!(corpus.epic_exists(Zone::Archived, "EPIC-1"));
                assert_eq!(record(&corpus, "_epics/_archive/EPIC-1").reason, "all-features-archived");
            }

            it "does not confuse EPIC-1 with EPIC-10" {
                corpus.linked(Zone::Active, "0050-live", "FS-050");
                corpus.feature(Zone::Active, "FS-050", "epic: EPIC-10");

                features(&corpus).archive_features(&forced()).unwrap();

                assert!(corpus.epic_exists(Zone::Archived, "EPIC-1"));
                assert!(corpus.epic_exists(Zone::Active, "EPIC-10"));
            }

            it "waits while any linked feature is active" {
                corpus.linked(Zone::Active, "0042-live", "FS-042");
                corpus.feature(Zone::Active, "FS-042", "epic: EPIC-1");

                let result = features(&corpus).archive_features(&forced()).unwrap();

                assert!(result.archived_epics.is_empty());
                assert!(result
                    .skipped
                    .iter()
                    .any(|s| s.id == "EPIC-1" && s.reason == "1/2 features still active"));
            }

            it "counts already-archived features" {
                corpus.feature(Zone::Archived, "FS-030", "epic: EPIC-10");

                features(&corpus).archive_features(&forced()).unwrap();

                assert!(corpus.epic_exists(Zone::Archived, "EPIC-10"));
            }

            it "archives orphaned epics only when allowed" {
                corpus.epic(Zone::Active, "EPIC-7");

                features(&corpus).archive_features(&forced()).unwrap();
                assert!(corpus.epic_exists(Zone::Active, "EPIC-7"));

                features(&corpus)
                    .archive_features(&FeatureArchiveOptions { archive_orphaned_epics: true, ..forced() })
                    .unwrap();
                assert!(corpus.epic_exists(Zone::Archived, "EPIC-7"));
            }

            it "plans features and epics together on a dry run" {
                let before = corpus.snapshot();

                let result = features(&corpus)
                    .archive_features(&FeatureArchiveOptions { dry_run: true, ..forced() })
                    .unwrap();

                assert_eq!(result.archived_features.len(), 1);
                assert_eq!(result.archived_epics, vec![EpicId::parse("EPIC-1").unwrap()]);
                assert!(result.updated_links.is_empty());
                assert_eq!(corpus.snapshot(), before);
            }
        }
    }

    describe "link rewriting" {
        before {
            corpus.linked(Zone::Archived, "0041-foo", "FS-041");
            corpus.linked(Zone::Active, "0042-bar", "FS-042");
            corpus.feature(Zone::Active, "FS-041", "epic: EPIC-1");
            corpus.feature(Zone::Active, "FS-042", "");
            corpus.shard(Zone::Active, "backend", "FS-041");
            corpus.epic(Zone::Active, "EPIC-1");
            corpus.write(
                "docs/overview.md",
                "# Overview\n\n[x](../_features/FS-041/FEATURE.md) and [y](../_features/FS-042/FEATURE.md)\n",
            );
        }

        it "points links at the archived feature and leaves others alone" {
            let result = features(&corpus).archive_features(&forced()).unwrap();

            let doc = corpus.read("docs/overview.md");
            assert!(doc.contains("[x](../_features/_archive/FS-041/FEATURE.md)"));
            assert!(doc.contains("[y](../_features/FS-042/FEATURE.md)"));
            assert_eq!(result.updated_links.len(), 1);
            assert_eq!(result.updated_links[0].file, "docs/overview.md");
            assert_eq!(result.updated_links[0].line_number, 3);
            assert_eq!(result.updated_links[0].old_link, "../_features/FS-041/FEATURE.md");
        }

        it "rewrites shard and epic links" {
            corpus.write(
                "README.md",
                "- [api](.specweave/docs/internal/specs/backend/FS-041/README.md#scope)\n\
                 - [epic](.specweave/docs/internal/specs/_epics/EPIC-1/EPIC.md)\n\
                 [ref]: .specweave/docs/internal/specs/_features/FS-041/FEATURE.md\n",
            );

            features(&corpus).archive_features(&forced()).unwrap();

            let readme = corpus.read("README.md");
            assert!(readme.contains("specs/backend/_archive/FS-041/README.md#scope)"));
            assert!(readme.contains("specs/_epics/_archive/EPIC-1/EPIC.md)"));
            assert!(readme.contains("[ref]: .specweave/docs/internal/specs/_features/_archive/FS-041/FEATURE.md"));
        }

        it "rewrites links whose text holds brackets, both ways" {
            let original = "[![badge](img.png)](../_features/FS-041/FEATURE.md)\n\
                            [see [FS-041] spec](../_features/FS-041/FEATURE.md)\n";
            corpus.write("docs/badges.md", original);

            let result = features(&corpus).archive_features(&forced()).unwrap();

            assert_eq!(
                corpus.read("docs/badges.md"),
                "[![badge](img.png)](../_features/_archive/FS-041/FEATURE.md)\n\
                 [see [FS-041] spec](../_features/_archive/FS-041/FEATURE.md)\n"
            );
            assert_eq!(result.updated_links.iter().filter(|u| u.file == "docs/badges.md").count(), 2);

            let restored = features(&corpus).restore_feature(&FeatureId::parse("FS-041").unwrap()).unwrap();

            assert_eq!(restored.iter().filter(|u| u.file == "docs/badges.md").count(), 2);
            assert_eq!(corpus.read("docs/badges.md"), original);
        }

        it "is idempotent across runs" {
            features(&corpus).archive_features(&forced()).unwrap();
            let once = corpus.read("docs/overview.md");

            let second = features(&corpus).archive_features(&forced()).unwrap();

            assert!(second.updated_links.is_empty());
            assert_eq!(corpus.read("docs/overview.md"), once);
        }

        it "can be turned off" {
            let result = features(&corpus)
                .archive_features(&FeatureArchiveOptions { update_links: false, ..forced() })
                .unwrap();

            assert!(result.updated_links.is_empty());
            assert!(corpus.read("docs/overview.md").contains("(../_features/FS-041/FEATURE.md)"));
        }

        it "skips excluded directories" {
            corpus.write("node_modules/pkg/README.md", "[x](../_features/FS-041/FEATURE.md)\n");
            corpus.write("vendor-docs/README.md", "[x](../_features/FS-041/FEATURE.md)\n");
            let manager = features(&corpus).with_link_rewriter(
                LinkRewriter::new(corpus.root()).with_excludes(vec!["vendor-docs".into()]),
            );

            manager.archive_features(&forced()).unwrap();

            assert!(corpus.read("vendor-docs/README.md").contains("(../_features/FS-041/"));
            assert!(corpus.read("node_modules/pkg/README.md").contains("(../_features/_archive/FS-041/"));
        }
    }

    describe "interrupted cascades" {
        before {
            corpus.linked(Zone::Archived, "0041-foo", "FS-041");
            corpus.shard(Zone::Active, "backend", "FS-041");
            corpus.write(
                "docs/a.md",
                "[x](../_features/FS-041/FEATURE.md)\n[s](../specs/backend/FS-041/README.md)\n",
            );
            let blocker = specs_path("backend/_archive");
        }

        it "counts the feature as archived when a shard move fails" {
            corpus.feature(Zone::Active, "FS-041", "");
            corpus.write(&blocker, "not a directory");

            let result = features(&corpus).archive_features(&forced()).unwrap();

            assert_eq!(result.archived_features, vec![FeatureId::parse("FS-041").unwrap()]);
            assert_eq!(result.errors.len(), 1);
            assert!(result.errors[0].contains("shard of feature FS-041"));
            assert!(corpus.feature_exists(Zone::Archived, "FS-041"));
            assert!(corpus.root().join(specs_path("backend/FS-041")).is_dir());
            assert!(corpus.read("docs/a.md").contains("[x](../_features/_archive/FS-041/FEATURE.md)"));
        }

        it "lets reconcile finish the stranded shard" {
            corpus.feature(Zone::Active, "FS-041", "");
            corpus.write(&blocker, "not a directory");
            features(&corpus).archive_features(&forced()).unwrap();
            std::fs::remove_file(corpus.root().join(&blocker)).unwrap();

            let report = features(&corpus).reconcile(&forced()).unwrap();

            assert_eq!(report.cascade.completed_features, vec![FeatureId::parse("FS-041").unwrap()]);
            assert!(report.cascade.errors.is_empty());
            assert!(corpus.root().join(specs_path("backend/_archive/FS-041")).is_dir());
            assert!(!corpus.root().join(specs_path("backend/FS-041")).exists());
            assert!(corpus.read("docs/a.md").contains("[s](../specs/backend/_archive/FS-041/README.md)"));

            let again = features(&corpus).reconcile(&forced()).unwrap();
            assert!(again.cascade.completed_features.is_empty());
            assert!(again.cascade.updated_links.is_empty());
        }

        it "repairs links left pointing at a stranded feature" {
            corpus.feature(Zone::Archived, "FS-041", "");

            let report = features(&corpus).reconcile(&forced()).unwrap();

            assert_eq!(report.cascade.completed_features, vec![FeatureId::parse("FS-041").unwrap()]);
            assert!(corpus.root().join(specs_path("backend/_archive/FS-041")).is_dir());
            assert_eq!(
                corpus.read("docs/a.md"),
                "[x](../_features/_archive/FS-041/FEATURE.md)\n[s](../specs/backend/_archive/FS-041/README.md)\n"
            );
        }

        it "only plans the repair on a dry run" {
            corpus.feature(Zone::Archived, "FS-041", "");
            let before = corpus.snapshot();

            let report = features(&corpus)
                .reconcile(&FeatureArchiveOptions { dry_run: true, ..forced() })
                .unwrap();

            assert_eq!(report.cascade.completed_features, vec![FeatureId::parse("FS-041").unwrap()]);
            assert_eq!(corpus.snapshot(), before);
        }
    }

    describe "restore" {
        before {
            corpus.linked(Zone::Active, "0041-foo", "FS-041");
            corpus.feature(Zone::Active, "FS-041", "Login flow");
            let backend = corpus.shard(Zone::Active, "backend", "FS-041");
            corpus.story(&backend, "us-001.md", "completed");
            corpus.write("docs/overview.md", "[x](../_features/FS-041/FEATURE.md)\n");
        }

        it "round-trips increment and feature to the original tree" {
            let before = corpus.snapshot();
            let manager = increments(&corpus, FeatureArchiveOptions::default());

            manager.archive(&only("0041-foo")).expect("archive failed");
            assert!(corpus.feature_exists(Zone::Archived, "FS-041"));
            assert!(corpus.read("docs/overview.md").contains("_features/_archive/FS-041"));

            let outcome = manager.restore("0041-foo").expect("restore failed");
            match outcome.feature_sync {
                Ok(FeatureSync::Restored { feature, links }) => {
                    assert_eq!(feature.as_str(), "FS-041");
                    assert_eq!(links.len(), 1);
                }
                other => panic!("unexpected feature sync: {:?}", other),
            }
            assert_eq!(corpus.snapshot(), before);
        }

        it "restores a feature with its shards" {
            std::fs::remove_dir_all(corpus.layout.increments_root()).unwrap();
            corpus.feature(Zone::Active, "FS-003", "");
            features(&corpus).archive_features(&FeatureArchiveOptions {
                archive_orphaned_features: true,
                ..FeatureArchiveOptions::default()
            }).unwrap();
            assert!(corpus.feature_exists(Zone::Archived, "FS-041"));

            let updates = features(&corpus).restore_feature(&FeatureId::parse("FS-041").unwrap()).unwrap();

            assert_eq!(updates.len(), 1);
            assert!(corpus.feature_exists(Zone::Active, "FS-041"));
            assert!(corpus.root().join(specs_path("backend/FS-041/us-001.md")).is_file());
            assert!(!corpus.root().join(specs_path(&format!("_features/FS-041/{}", ARCHIVE_RECORD_FILE))).exists());
            assert!(corpus.feature_exists(Zone::Archived, "FS-003"));
        }

        it "fails for a feature that is not archived" {
            let err = features(&corpus).restore_feature(&FeatureId::parse("FS-041").unwrap()).unwrap_err();
            assert!(matches!(err, ArchiveError::NotFound(_)));
        }

        it "fails when the feature is already active" {
            corpus.feature(Zone::Archived, "FS-041", "stale");

            let err = features(&corpus).restore_feature(&FeatureId::parse("FS-041").unwrap()).unwrap_err();
            assert!(matches!(err, ArchiveError::AlreadyActive(_)));
        }

        it "cleans duplicates instead of restoring a feature in both zones" {
            corpus.completed(Zone::Archived, "0041-foo");
            std::fs::remove_dir_all(corpus.layout.increments_dir(Zone::Active).join("0041-foo")).unwrap();
            corpus.feature(Zone::Archived, "FS-041", "stale");

            let outcome = increments(&corpus, FeatureArchiveOptions::default())
                .restore("0041-foo")
                .expect("restore failed");

            assert!(matches!(outcome.feature_sync, Ok(FeatureSync::DuplicatesCleaned { .. })));
            assert!(corpus.feature_exists(Zone::Active, "FS-041"));
            assert!(!corpus.feature_exists(Zone::Archived, "FS-041"));
        }

        it "restores an epic and its links" {
            corpus.epic(Zone::Archived, "EPIC-2");
            corpus.write("docs/epics.md", "[e](../_epics/_archive/EPIC-2/EPIC.md)\n");

            let updates = features(&corpus).restore_epic(&EpicId::parse("EPIC-2").unwrap()).unwrap();

            assert_eq!(updates.len(), 1);
            assert!(corpus.epic_exists(Zone::Active, "EPIC-2"));
            assert_eq!(corpus.read("docs/epics.md"), "[e](../_epics/EPIC-2/EPIC.md)\n");
        }
    }

    describe "cleanup_duplicates" {
        it "removes archived copies of active ids" {
            corpus.feature(Zone::Active, "FS-041", "live");
            corpus.feature(Zone::Archived, "FS-041", "stale");
            corpus.shard(Zone::Active, "backend", "FS-041");
            corpus.shard(Zone::Archived, "backend", "FS-041");
            corpus.feature(Zone::Archived, "FS-010", "only archived");
            corpus.epic(Zone::Active, "EPIC-1");
            corpus.epic(Zone::Archived, "EPIC-1");

            let report = features(&corpus).cleanup_duplicates().unwrap();

            assert_eq!(report.cleaned, vec![
                "_features/_archive/FS-041".to_string(),
                "backend/_archive/FS-041".to_string(),
                "_epics/_archive/EPIC-1".to_string(),
            ]);
            assert!(report.errors.is_empty());
            assert!(corpus.read(&specs_path("_features/FS-041/FEATURE.md")).contains("live"));
            assert!(corpus.feature_exists(Zone::Archived, "FS-010"));
            assert!(corpus.epic_exists(Zone::Active, "EPIC-1"));
        }
    }

    describe "reporting and repair" {
        it "counts features and epics per zone and project" {
            corpus.feature(Zone::Active, "FS-001", "");
            corpus.feature(Zone::Archived, "FS-002", "");
            corpus.feature(Zone::Archived, "FS-003", "");
            corpus.epic(Zone::Active, "EPIC-1");
            corpus.shard(Zone::Active, "backend", "FS-001");
            corpus.shard(Zone::Archived, "backend", "FS-002");
            corpus.shard(Zone::Archived, "frontend", "FS-003");

            let stats = features(&corpus).get_archive_stats().unwrap();

            assert_eq!(stats.features, ZoneCounts { active: 1, archived: 2 });
            assert_eq!(stats.epics, ZoneCounts { active: 1, archived: 0 });
            assert_eq!(stats.projects["backend"], ZoneCounts { active: 1, archived: 1 });
            assert_eq!(stats.projects["frontend"], ZoneCounts { active: 0, archived: 1 });
        }

        it "reconciles a half-cascaded corpus" {
            corpus.linked(Zone::Archived, "0041-foo", "FS-041");
            corpus.feature(Zone::Active, "FS-041", "");
            corpus.shard(Zone::Active, "backend", "FS-041");
            corpus.feature(Zone::Active, "FS-050", "");
            corpus.feature(Zone::Archived, "FS-050", "stale");

            let report = features(&corpus).reconcile(&forced()).unwrap();

            assert_eq!(report.cleanup.cleaned, vec!["_features/_archive/FS-050".to_string()]);
            assert!(report.cascade.archived_features.contains(&FeatureId::parse("FS-041").unwrap()));
            assert!(corpus.root().join(specs_path("backend/_archive/FS-041")).is_dir());

            let again = features(&corpus).reconcile(&forced()).unwrap();
            assert!(again.cleanup.cleaned.is_empty());
            assert!(again.cascade.archived_features.is_empty());
        }
    }
}
