//! Initial database migration.
//!
//! Creates departments, users, expenses with their audit comments, and
//! reports, plus the trigger that keeps report status one-way.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ORGANIZATION
        // ============================================================
        db.execute_unprepared(DEPARTMENTS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 2: EXPENSES
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(EXPENSE_COMMENTS_SQL).await?;

        // ============================================================
        // PART 3: REPORTS
        // ============================================================
        db.execute_unprepared(REPORTS_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const DEPARTMENTS_SQL: &str = r"
CREATE TABLE departments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL UNIQUE,
    manager_id UUID,
    total_budget NUMERIC(19, 4) NOT NULL DEFAULT 0,
    allowed_categories JSONB NOT NULL DEFAULT '[]',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_total_budget_non_negative CHECK (total_budget >= 0)
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    role VARCHAR(20) NOT NULL DEFAULT 'employee',
    department_id UUID REFERENCES departments(id) ON DELETE SET NULL,
    -- May go negative; approvals are never blocked by the limit.
    allotted_limit NUMERIC(19, 4),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_user_role CHECK (role IN ('employee', 'manager', 'admin'))
);

CREATE INDEX idx_users_department ON users(department_id);

ALTER TABLE departments
    ADD CONSTRAINT fk_departments_manager
    FOREIGN KEY (manager_id) REFERENCES users(id) ON DELETE SET NULL;
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    owner_id UUID NOT NULL REFERENCES users(id),
    department_id UUID REFERENCES departments(id) ON DELETE SET NULL,
    department_name VARCHAR(255),
    merchant VARCHAR(255) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    category VARCHAR(100) NOT NULL,
    description TEXT,
    expense_date DATE,
    fingerprint CHAR(64),
    submission_status VARCHAR(20) NOT NULL DEFAULT 'draft',
    approval_status VARCHAR(20) NOT NULL DEFAULT 'pending',
    rejection_reason TEXT,

    -- Audit trail
    submitted_by UUID REFERENCES users(id),
    submitted_at TIMESTAMPTZ,
    flagged_at TIMESTAMPTZ,
    approved_by UUID REFERENCES users(id),
    approved_at TIMESTAMPTZ,
    approval_source VARCHAR(20),
    rejected_by UUID REFERENCES users(id),
    rejected_at TIMESTAMPTZ,

    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_currency_format CHECK (currency ~ '^[A-Z]{3}$'),
    CONSTRAINT chk_submission_status CHECK (submission_status IN ('draft', 'submitted')),
    CONSTRAINT chk_approval_status CHECK (
        approval_status IN ('pending', 'auto_flagged', 'approved', 'rejected')
    ),
    CONSTRAINT chk_draft_is_pending CHECK (
        submission_status = 'submitted' OR approval_status = 'pending'
    ),
    CONSTRAINT chk_rejection_has_reason CHECK (
        approval_status <> 'rejected' OR rejection_reason IS NOT NULL
    )
);

CREATE INDEX idx_expenses_owner_fingerprint ON expenses(owner_id, fingerprint)
    WHERE fingerprint IS NOT NULL;
CREATE INDEX idx_expenses_owner_merchant ON expenses(owner_id, lower(merchant), amount, created_at);
CREATE INDEX idx_expenses_status ON expenses(submission_status, approval_status, created_at);
CREATE INDEX idx_expenses_approved_date ON expenses(owner_id, expense_date)
    WHERE approval_status = 'approved';
";

const EXPENSE_COMMENTS_SQL: &str = r"
CREATE TABLE expense_comments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    author_id UUID NOT NULL REFERENCES users(id),
    body TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_expense_comments_expense ON expense_comments(expense_id, created_at);
";

const REPORTS_SQL: &str = r"
CREATE TABLE reports (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    owner_id UUID NOT NULL REFERENCES users(id),
    external_id VARCHAR(64) NOT NULL UNIQUE,
    title VARCHAR(255) NOT NULL,
    kind VARCHAR(20) NOT NULL,
    period_from DATE NOT NULL,
    period_to DATE NOT NULL,
    categories JSONB NOT NULL DEFAULT '[]',
    department_id UUID REFERENCES departments(id) ON DELETE SET NULL,
    employee_ids JSONB NOT NULL DEFAULT '[]',
    status VARCHAR(20) NOT NULL DEFAULT 'generating',
    summary JSONB,
    analysis JSONB,
    -- Weak references: expenses may be deleted later.
    expense_ids JSONB NOT NULL DEFAULT '[]',
    document_location TEXT,
    error_detail TEXT,
    render_error TEXT,
    generated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_report_kind CHECK (kind IN ('individual', 'team')),
    CONSTRAINT chk_report_status CHECK (status IN ('generating', 'completed', 'failed')),
    CONSTRAINT chk_report_period CHECK (period_from <= period_to),
    CONSTRAINT chk_completed_has_analysis CHECK (status <> 'completed' OR analysis IS NOT NULL)
);

CREATE INDEX idx_reports_owner_generated ON reports(owner_id, generated_at DESC);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_report_status_regression
-- Report status moves one way: generating -> completed | failed
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_report_status_regression()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'generating' AND NEW.status <> OLD.status THEN
        RAISE EXCEPTION 'Cannot change status of % report', OLD.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_report_status_regression
BEFORE UPDATE ON reports
FOR EACH ROW
EXECUTE FUNCTION prevent_report_status_regression();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

DROP TRIGGER IF EXISTS trg_prevent_report_status_regression ON reports;
DROP FUNCTION IF EXISTS prevent_report_status_regression();

DROP TABLE IF EXISTS reports CASCADE;
DROP TABLE IF EXISTS expense_comments CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS departments CASCADE;
";
