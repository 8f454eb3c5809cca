//! Per-request scopes over a shared permanent context.
//!
//! Run with `RUST_LOG=keneth_container=trace` to watch resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use keneth::prelude::*;
use tracing_subscriber::EnvFilter;

// === Services ===

struct Pool {
    url: String,
}

impl Service for Pool {
    fn signature() -> Signature {
        Signature::new().binding("db_url").binding_or("pool_size", 4usize)
    }

    fn construct(args: &Arguments) -> Result<Self> {
        let url = args.binding::<String>("db_url")?;
        let size = args.binding::<usize>("pool_size")?;
        tracing::info!(url = %url, size = *size, "Opening pool");
        Ok(Pool { url: url.to_string() })
    }
}

struct RequestId(u64);

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

impl Service for RequestId {
    fn construct(_: &Arguments) -> Result<Self> {
        Ok(RequestId(NEXT_REQUEST.fetch_add(1, Ordering::Relaxed)))
    }
}

struct UserRepo {
    pool: Arc<Pool>,
    request: Arc<RequestId>,
}

impl UserRepo {
    fn find(&self, id: u64) -> String {
        format!(
            "[req {}] SELECT * FROM users WHERE id = {id} on {}",
            self.request.0, self.pool.url
        )
    }
}

impl Service for UserRepo {
    fn signature() -> Signature {
        Signature::new().service::<Pool>().service::<RequestId>()
    }

    fn construct(args: &Arguments) -> Result<Self> {
        Ok(UserRepo {
            pool: args.service::<Pool>()?,
            request: args.service::<RequestId>()?,
        })
    }
}

// === Handler ===

fn show_user(user_id: u64) -> impl Injectable<Output = String> {
    inject(
        Signature::new().service::<UserRepo>().optional_binding("tenant"),
        move |args| {
            let repo = args.service::<UserRepo>()?;
            let tenant = args.optional_binding::<String>("tenant")?;
            let tenant = tenant.as_deref().map_or("default", String::as_str);
            Ok(format!("{} (tenant: {tenant})", repo.find(user_id)))
        },
    )
    .named("show_user")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = Container::builder()
        .binding("db_url", String::from("sqlite://mem"))
        .service::<Pool>()
        .service::<RequestId>()
        .service::<UserRepo>()
        .build()?;

    // The pool lives for the whole process.
    let _: Arc<Pool> = app.provide()?;
    app.elevate::<Pool>();

    for (user_id, tenant) in [(1, None), (2, Some("acme")), (3, None)] {
        let request = app.create_scope();
        if let Some(tenant) = tenant {
            request.get_context().add_binding("tenant", tenant.to_string());
        }

        println!("{}", request.call(show_user(user_id))?);
        request.clear_context();
    }

    Ok(())
}
