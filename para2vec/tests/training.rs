//! End-to-end tests: build statistics from a corpus file, train, export.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

use para2vec::sink;
use para2vec::{Model, ModelConfig, RandomStream, Trainer};

fn write_corpus(dir: &TempDir, lines: &[String]) -> PathBuf {
    let path = dir.path().join("corpus.txt");
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(&path, text).unwrap();
    path
}

fn small_corpus(dir: &TempDir, num_documents: usize) -> PathBuf {
    let lines: Vec<String> = (0..num_documents)
        .map(|i| format!("a b c a b c w{}", i % 3))
        .collect();
    write_corpus(dir, &lines)
}

fn config(path: &Path) -> ModelConfig {
    ModelConfig {
        min_count: 1,
        word_dim: 4,
        paragraph_dim: 3,
        context_len: 2,
        sample: 0.0,
        seed: 7,
        ..ModelConfig::new(path)
    }
}

fn all_values(model: &Model) -> Vec<Vec<f64>> {
    model
        .store()
        .matrices()
        .into_iter()
        .map(|(_, m)| m.to_row_major())
        .collect()
}

fn train(config: ModelConfig, threads: usize, epochs: usize, negative: usize) -> Model {
    let mut rng = RandomStream::new(config.seed);
    let model = Model::build(config, &mut rng).unwrap();
    let mut trainer = Trainer::new(threads, rng).unwrap();
    for epoch in 0..epochs {
        let alpha = 0.05 * (epochs - epoch) as f64 / epochs as f64;
        trainer
            .train(&model, alpha, 0.05 / epochs as f64, negative)
            .unwrap();
    }
    model
}

#[test]
fn single_thread_training_is_deterministic() {
    let dir = tempdir().unwrap();
    let path = small_corpus(&dir, 12);

    let a = train(config(&path), 1, 3, 2);
    let b = train(config(&path), 1, 3, 2);
    assert_eq!(all_values(&a), all_values(&b));
    assert!(a
        .store()
        .score_vectors()
        .to_row_major()
        .iter()
        .any(|&v| v != 0.0));

    let c = train(ModelConfig { seed: 8, ..config(&path) }, 1, 3, 2);
    assert_ne!(all_values(&a), all_values(&c));
}

#[test]
fn every_document_is_trained_once_per_pass() {
    let dir = tempdir().unwrap();
    let path = small_corpus(&dir, 9);

    let mut rng = RandomStream::new(1);
    let model = Model::build(config(&path), &mut rng).unwrap();
    assert_eq!(model.vocab().num_documents(), 9);
    assert_eq!(model.store().paragraph_vectors().cols(), 9);

    let before: Vec<Vec<f64>> = (0..9)
        .map(|p| model.store().paragraph_vector(p).iter().map(|r| r.get()).collect())
        .collect();

    let mut trainer = Trainer::new(4, rng).unwrap();
    let stats = trainer.train(&model, 0.05, 0.05, 2).unwrap();
    assert_eq!(stats.trained, 9 * 7);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.examples, 9 * 7 * 3);

    for (p, old) in before.iter().enumerate() {
        let new: Vec<f64> = model.store().paragraph_vector(p).iter().map(|r| r.get()).collect();
        assert_ne!(&new, old, "paragraph {p} was not trained");
    }

    // A second pass reuses the same workers.
    let stats = trainer.train(&model, 0.025, 0.025, 2).unwrap();
    assert_eq!(stats.trained, 9 * 7);
}

#[test]
fn one_trainer_for_models_of_different_shapes() {
    let small_dir = tempdir().unwrap();
    let large_dir = tempdir().unwrap();
    let small_config = config(&small_corpus(&small_dir, 4));
    let small = Model::build(small_config, &mut RandomStream::new(1)).unwrap();
    let large = Model::build(
        ModelConfig {
            word_dim: 6,
            paragraph_dim: 5,
            context_len: 3,
            ..config(&small_corpus(&large_dir, 6))
        },
        &mut RandomStream::new(2),
    )
    .unwrap();

    let mut trainer = Trainer::new(2, RandomStream::new(3)).unwrap();
    let stats = trainer.train(&small, 0.05, 0.05, 2).unwrap();
    assert_eq!(stats.trained, 4 * 7);
    let stats = trainer.train(&large, 0.05, 0.05, 2).unwrap();
    assert_eq!(stats.trained, 6 * 7);
    let stats = trainer.train(&small, 0.05, 0.05, 2).unwrap();
    assert_eq!(stats.trained, 4 * 7);
}

#[test]
fn more_threads_than_documents() {
    let dir = tempdir().unwrap();
    let path = small_corpus(&dir, 3);
    let mut rng = RandomStream::new(1);
    let model = Model::build(config(&path), &mut rng).unwrap();
    let mut trainer = Trainer::new(8, rng).unwrap();
    let stats = trainer.train(&model, 0.05, 0.05, 1).unwrap();
    assert_eq!(stats.trained, 3 * 7);
}

#[test]
fn no_negative_samples() {
    let dir = tempdir().unwrap();
    let path = small_corpus(&dir, 4);
    let mut rng = RandomStream::new(1);
    let model = Model::build(config(&path), &mut rng).unwrap();
    let mut trainer = Trainer::new(2, rng).unwrap();
    let stats = trainer.train(&model, 0.05, 0.05, 0).unwrap();
    assert_eq!(stats.trained, 4 * 7);
    assert_eq!(stats.examples, 4 * 7);

    // Only the words that occur as targets have nonzero word-score columns.
    let vocab = model.vocab();
    for word in 0..vocab.vocab_size() {
        let column = model.store().score_column(word);
        let touched = column.paragraph_block().iter().any(|r| r.get() != 0.0);
        assert_eq!(touched, word < vocab.num_words(), "word {}", vocab.word(word));
    }
}

#[test]
fn rare_words_are_not_exported() {
    let dir = tempdir().unwrap();
    let lines = vec![
        "the cat sat on the mat".to_string(),
        "the dog sat on the zebra".to_string(),
        "the cat ran".to_string(),
    ];
    let path = write_corpus(&dir, &lines);
    let model = train(
        ModelConfig {
            min_count: 2,
            ..config(&path)
        },
        2,
        1,
        1,
    );
    let vocab = model.vocab();
    assert_eq!(vocab.lookup("zebra"), None);
    assert_eq!(vocab.num_words(), 4); // the cat sat on

    let mut out = vec![];
    sink::write_word_vectors(vocab, model.store(), &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    let words: Vec<&str> = out.lines().map(|l| l.split(' ').next().unwrap()).collect();
    assert_eq!(words, ["the", "cat", "sat", "on"]);
    for line in out.lines() {
        assert_eq!(line.split(' ').count(), 1 + 4);
    }

    let mut out = vec![];
    sink::write_paragraph_vectors(model.store(), &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out.lines().count(), 3);
    assert!(out.lines().nth(2).unwrap().starts_with("2 "));
}

#[test]
fn saved_model_loads_back() {
    let dir = tempdir().unwrap();
    let path = small_corpus(&dir, 5);
    let model_file = dir.path().join("model.bin");

    let trained = train(config(&path), 2, 2, 2);
    sink::save_model(trained.store(), &model_file).unwrap();

    let fresh = Model::build(config(&path), &mut RandomStream::new(99)).unwrap();
    assert_ne!(all_values(&trained), all_values(&fresh));
    sink::load_model(fresh.store(), &model_file).unwrap();
    assert_eq!(all_values(&trained), all_values(&fresh));

    let wrong_shape = Model::build(
        ModelConfig {
            word_dim: 5,
            ..config(&path)
        },
        &mut RandomStream::new(1),
    )
    .unwrap();
    let err = sink::load_model(wrong_shape.store(), &model_file).unwrap_err();
    assert!(format!("{err:#}").contains("word matrix is 4x"), "{err:#}");

    assert!(sink::load_model(fresh.store(), &dir.path().join("missing.bin")).is_err());
}

#[test]
fn text_exports_to_files() {
    let dir = tempdir().unwrap();
    let path = small_corpus(&dir, 2);
    let model = train(config(&path), 1, 1, 1);
    let words = dir.path().join("words.txt");
    let paragraphs = dir.path().join("paragraphs.txt");
    let vocab_file = dir.path().join("vocab.txt");
    sink::save_word_vectors(model.vocab(), model.store(), &words).unwrap();
    sink::save_paragraph_vectors(model.store(), &paragraphs).unwrap();
    model.vocab().save(&vocab_file).unwrap();

    assert_eq!(fs::read_to_string(&words).unwrap().lines().count(), 5);
    assert_eq!(fs::read_to_string(&paragraphs).unwrap().lines().count(), 2);
    assert_eq!(
        fs::read_to_string(&vocab_file).unwrap(),
        "a 4\nb 4\nc 4\nw0 1\nw1 1\n"
    );
}

#[test]
fn missing_corpus_is_an_error() {
    let dir = tempdir().unwrap();
    let config = ModelConfig::new(dir.path().join("nope.txt"));
    let err = Model::build(config, &mut RandomStream::new(1)).err().unwrap();
    assert!(format!("{err:#}").contains("error opening training data file"));
}

#[test]
fn too_many_negative_samples() {
    let dir = tempdir().unwrap();
    let path = write_corpus(&dir, &["x y".to_string(), "y x".to_string()]);
    let mut rng = RandomStream::new(1);
    let model = Model::build(config(&path), &mut rng).unwrap();
    let mut trainer = Trainer::new(1, rng).unwrap();
    assert!(trainer.train(&model, 0.05, 0.05, 1).is_ok());
    let err = trainer.train(&model, 0.05, 0.05, 2).unwrap_err();
    assert!(err.to_string().contains("insufficient negative-sample pool"));
}
