//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod activity_log;
pub mod analytics_event;
pub mod article_feedback;
pub mod campaign;
pub mod campaign_usage;
pub mod company;
pub mod company_document;
pub mod company_snapshot;
pub mod contest_entry;
pub mod corporate_action;
pub mod deal;
pub mod feature_flag;
pub mod help_article;
pub mod investment;
pub mod kyc_document;
pub mod kyc_record;
pub mod legal_agreement;
pub mod listing_activity;
pub mod morph;
pub mod notification;
pub mod payment;
pub mod payout;
pub mod referral;
pub mod referral_campaign;
pub mod saga_execution;
pub mod saga_step;
pub mod sector;
pub mod subscription;
pub mod support_message;
pub mod support_ticket;
pub mod user;
pub mod user_agreement_signature;

// Re-export entity types under table-style names to avoid `Entity`/`Model` clashes
pub use activity_log::Entity as ActivityLog;
pub use analytics_event::Entity as AnalyticsEvent;
pub use article_feedback::Entity as ArticleFeedback;
pub use campaign::Entity as Campaign;
pub use campaign_usage::Entity as CampaignUsage;
pub use company::Entity as Company;
pub use company_document::Entity as CompanyDocument;
pub use company_snapshot::Entity as CompanySnapshot;
pub use contest_entry::Entity as ContestEntry;
pub use corporate_action::Entity as CorporateAction;
pub use deal::Entity as Deal;
pub use feature_flag::Entity as FeatureFlag;
pub use help_article::Entity as HelpArticle;
pub use investment::Entity as Investment;
pub use kyc_document::Entity as KycDocument;
pub use kyc_record::Entity as KycRecord;
pub use legal_agreement::Entity as LegalAgreement;
pub use listing_activity::Entity as ListingActivity;
pub use morph::MorphType;
pub use notification::Entity as Notification;
pub use payment::Entity as Payment;
pub use payout::Entity as Payout;
pub use referral::Entity as Referral;
pub use referral_campaign::Entity as ReferralCampaign;
pub use saga_execution::Entity as SagaExecution;
pub use saga_step::Entity as SagaStep;
pub use sector::Entity as Sector;
pub use subscription::Entity as Subscription;
pub use support_message::Entity as SupportMessage;
pub use support_ticket::Entity as SupportTicket;
pub use user::Entity as User;
pub use user_agreement_signature::Entity as UserAgreementSignature;
