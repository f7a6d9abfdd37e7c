use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Tenants. Plan state is derived from the plan catalog and
        -- mutated only by the entitlement applier / expiry sweep.
        CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            slug TEXT UNIQUE NOT NULL,
            email TEXT,
            phone TEXT,
            plan TEXT NOT NULL DEFAULT 'free' CHECK (plan IN ('free', 'basic', 'pro')),
            plan_expiry_date INTEGER,
            cards_limit INTEGER NOT NULL DEFAULT 2,
            white_label_enabled INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_companies_plan_expiry
            ON companies(plan_expiry_date) WHERE plan != 'free';

        -- Platform users (identity only - auth lives elsewhere)
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT UNIQUE NOT NULL,
            username TEXT UNIQUE NOT NULL,
            email TEXT UNIQUE NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('master_admin', 'company_admin', 'sales_person')),
            company_id INTEGER REFERENCES companies(id),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_company ON users(company_id);

        -- One row per attempted plan purchase. order_id is immutable and
        -- globally unique; status is write-once into a terminal state.
        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT UNIQUE NOT NULL,
            company_id INTEGER NOT NULL REFERENCES companies(id),
            order_id TEXT UNIQUE NOT NULL,
            transaction_id TEXT,
            amount REAL NOT NULL,
            currency TEXT NOT NULL DEFAULT 'INR',
            plan TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'success', 'failed', 'checksum_failed')),
            payment_mode TEXT,
            bank_name TEXT,
            bank_txn_id TEXT,
            checksum_verified INTEGER NOT NULL DEFAULT 0,
            gateway_response TEXT,
            invoice_number TEXT,
            created_at INTEGER NOT NULL,
            completed_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_payments_company ON payments(company_id);

        -- Inbound leads, tenant-scoped
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT UNIQUE NOT NULL,
            name TEXT,
            phone TEXT NOT NULL,
            email TEXT,
            source TEXT NOT NULL,
            ip_address TEXT,
            company_id INTEGER NOT NULL REFERENCES companies(id),
            assigned_to INTEGER REFERENCES users(id),
            status TEXT NOT NULL DEFAULT 'new'
                CHECK (status IN ('new', 'contacted', 'follow_up', 'interested', 'converted', 'closed')),
            remarks TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_leads_company ON leads(company_id);
        CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status);

        -- Lead-ingestion keys. Only the hash of the secret is stored.
        CREATE TABLE IF NOT EXISTS api_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL REFERENCES companies(id),
            key_prefix TEXT NOT NULL,
            key_hash TEXT UNIQUE NOT NULL,
            name TEXT,
            source_type TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            last_used INTEGER,
            usage_count INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_api_keys_company ON api_keys(company_id);
        "#,
    )
}
