//! Exam sessions driven by mock providers.

use std::collections::HashMap;
use std::sync::Arc;

use pagequiz_core::document::TextDocument;
use pagequiz_core::generation::{GenerationConfig, ModelSpec};
use pagequiz_core::traits::LlmProvider;
use pagequiz_core::{
    Answer, Difficulty, ExamConfig, ExamSession, ExamType, GenerationClient, PageSelection,
    QuestionSource, SessionState,
};
use pagequiz_providers::mock::{MockOutcome, MockProvider};
use pagequiz_providers::ProviderError;

const PAGE: &str = "Photosynthesis converts light energy into chemical energy inside plant cells. \
    Chlorophyll absorbs mostly red and blue wavelengths of visible light. \
    Oxygen is released as a by-product when water molecules are split.";

const MCQ_RESPONSE: &str = "Q: Which pigment absorbs red light?\nA) Keratin\nB) Chlorophyll\nC) Melanin\nD) Hemoglobin\nCORRECT: B\n---\n\
    Q: What is released when water is split?\nA) Oxygen\nB) Nitrogen\nC) Carbon\nD) Helium\nCORRECT: A";

fn client(providers: &[(&str, Arc<MockProvider>)]) -> GenerationClient {
    let chain = providers
        .iter()
        .map(|(name, _)| ModelSpec::new(*name, "mock-model"))
        .collect();
    let providers = providers
        .iter()
        .map(|(name, provider)| (name.to_string(), provider.clone() as Arc<dyn LlmProvider>))
        .collect::<HashMap<_, _>>();
    GenerationClient::new(
        providers,
        GenerationConfig {
            chain,
            ..GenerationConfig::default()
        },
    )
}

fn session(client: GenerationClient) -> ExamSession {
    ExamSession::new(client).with_document(Arc::new(TextDocument::new(vec![
        PAGE.to_string(),
        PAGE.to_string(),
    ])))
}

fn mcq_exam(count: usize) -> ExamConfig {
    ExamConfig {
        exam_type: ExamType::Mcq,
        question_count: count,
        difficulty: Difficulty::Hard,
        page_selection: PageSelection::Range { start: 1, end: 2 },
    }
}

#[tokio::test]
async fn failing_primary_hands_over_to_backup() {
    let primary = Arc::new(MockProvider::failing(
        || ProviderError::RateLimited {
            retry_after_ms: 5000,
        },
        1,
    ));
    let backup = Arc::new(MockProvider::with_fixed_response(MCQ_RESPONSE));
    let mut session = session(client(&[
        ("primary", primary.clone()),
        ("backup", backup.clone()),
    ]));

    session.start(mcq_exam(5)).await.unwrap();

    assert_eq!(primary.call_count(), 1);
    assert_eq!(backup.call_count(), 1);
    assert_eq!(
        session.source(),
        Some(&QuestionSource::Provider {
            provider: "backup".into(),
            model: "mock-model".into()
        })
    );

    let request = backup.last_request().unwrap();
    assert_eq!(request.model, "mock-model");
    assert_eq!(request.temperature, 0.7);
    assert!(request.prompt.contains("Chlorophyll absorbs"));

    assert!(session.record_answer(0, Answer::Choice('B')));
    assert!(session.record_answer(1, Answer::Choice('C')));
    let result = session.submit().unwrap();
    assert_eq!((result.correct, result.total, result.percent), (1, 2, 50));
}

#[tokio::test]
async fn unparseable_reply_advances_the_chain() {
    let chatty = Arc::new(MockProvider::with_script(vec![MockOutcome::Respond(
        "Sure! Here are some great questions about plants.".into(),
    )]));
    let backup = Arc::new(MockProvider::with_fixed_response(MCQ_RESPONSE));
    let mut session = session(client(&[("chatty", chatty.clone()), ("backup", backup)]));

    session.start(mcq_exam(1)).await.unwrap();

    assert_eq!(chatty.call_count(), 1);
    assert_eq!(session.questions().len(), 1);
    assert!(matches!(
        session.source(),
        Some(QuestionSource::Provider { provider, .. }) if provider == "backup"
    ));
}

#[tokio::test]
async fn all_mocks_failing_falls_back_to_heuristic() {
    let first = Arc::new(MockProvider::failing(
        || ProviderError::ModelNotFound("mock-model".into()),
        1,
    ));
    let second = Arc::new(MockProvider::failing(
        || ProviderError::NetworkError("connection reset".into()),
        1,
    ));
    let mut session = session(client(&[("first", first.clone()), ("second", second.clone())]));

    session.start(mcq_exam(3)).await.unwrap();

    assert_eq!(first.call_count(), 1);
    assert_eq!(second.call_count(), 1);
    assert_eq!(session.state(), SessionState::InProgress);
    assert_eq!(session.source(), Some(&QuestionSource::Heuristic));
    assert!(!session.questions().is_empty());
    assert!(session.questions().len() <= 3);
}

#[tokio::test]
async fn retake_reuses_questions_without_new_calls() {
    let provider = Arc::new(MockProvider::with_fixed_response(MCQ_RESPONSE));
    let mut session = session(client(&[("only", provider.clone())]));

    session.start(mcq_exam(2)).await.unwrap();
    let questions = session.questions().to_vec();
    assert!(session.record_answer(0, Answer::Choice('B')));
    session.submit().unwrap();

    session.retake().unwrap();
    assert_eq!(session.questions(), questions.as_slice());
    assert!(session.answers().is_empty());
    assert_eq!(provider.call_count(), 1);
}
