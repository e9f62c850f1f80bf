pub mod chatbot;
pub mod classifier;
pub mod guidance;
pub mod image_analysis;
pub mod notifications;

pub use chatbot::ChatbotService;
pub use classifier::ClassifierService;
pub use guidance::GuidanceService;
pub use image_analysis::ImageAnalysisService;
pub use notifications::NotificationService;
