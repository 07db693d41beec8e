mod chunker;
mod extractor;
mod fetcher;
mod merger;
mod model_extractor;
mod ner;
mod pipeline;
mod sources;
mod text;

pub use chunker::Chunker;
pub use extractor::{
    CandidateMember, ExtractionError, ExtractionOutput, ExtractionResult, ExtractionStrategy,
    FactField, FactPattern, MemberExtractor, PatternExtractor, RolePattern,
};
pub use fetcher::{
    extract_main_text, page_title, ContentFetcher, FetchError, FetchResult, FetchedPage,
    PageMetadata, DEFAULT_MIN_FRAGMENT_CHARS,
};
pub use merger::{merge_results, MergedRecord};
pub use model_extractor::{parse_model_reply, ModelExtractor};
pub use ner::{is_honorific, strip_honorifics, HeuristicPersonRecognizer, PersonRecognizer, TextSpan};
pub use pipeline::{OrganizationProcessor, ProcessOutput, ProcessStats};
pub use sources::{SourceCollector, SourceDocument};
pub use text::{clean_text, split_sentences, title_case};
