//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, members, panels, reports};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LibraryFlow API",
        version = "1.0.0",
        description = "Library circulation REST API: catalog, roster and lending ledger",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::search_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Members
        members::list_members,
        members::search_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        members::get_member_fines,
        // Loans
        loans::list_loans,
        loans::issue_book,
        loans::get_loan,
        loans::return_book,
        loans::current_loans,
        loans::search_current_loans,
        loans::overdue_loans,
        loans::search_overdue_loans,
        loans::suggest_due_date,
        // Reports
        reports::dashboard,
        reports::recent_activity,
        reports::overdue_reminders,
        panels::render_panel,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookData,
            crate::models::report::BookResults,
            // Members
            crate::models::member::Member,
            crate::models::member::MemberData,
            crate::models::enums::MemberType,
            crate::models::enums::MemberStatus,
            crate::models::report::MemberResults,
            crate::models::report::MemberFines,
            // Loans
            crate::models::loan::Loan,
            crate::models::enums::LoanStatus,
            crate::models::loan::IssueRequest,
            crate::models::loan::IssueReceipt,
            crate::models::loan::ReturnRequest,
            crate::models::loan::ReturnReceipt,
            crate::models::loan::DueDateSuggestion,
            crate::models::report::CurrentLoan,
            crate::models::report::CurrentLoanResults,
            crate::models::report::OverdueLoan,
            crate::models::report::OverdueLoanResults,
            // Reports
            crate::models::report::ActivityKind,
            crate::models::report::ActivityEntry,
            crate::models::report::Era,
            crate::models::report::EraCount,
            crate::models::report::DailyIssues,
            crate::models::report::DashboardStats,
            crate::models::report::OverdueReminder,
            crate::models::report::IssueForm,
            crate::models::panel::Panel,
            crate::models::panel::PanelView,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "members", description = "Member roster"),
        (name = "loans", description = "Lending ledger"),
        (name = "reports", description = "Read-only reporting views"),
        (name = "panels", description = "Front-end panel data")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
