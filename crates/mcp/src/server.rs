//! MCP Server Implementation
//!
//! Implements the Model Context Protocol server for the vehicle inventory.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{
        AnnotateAble, CallToolRequestParams, CallToolResult, ListResourcesResult,
        ListToolsResult, PaginatedRequestParams, RawResource, ReadResourceRequestParams,
        ReadResourceResult, Resource, ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router, ErrorData, ServerHandler,
};
use tracing::{info, warn};

use carlot_core::inventory::{
    RESOURCE_ALL_VEHICLES, RESOURCE_BRANDS, TOOL_GET_AVAILABLE_BRANDS, TOOL_GET_VEHICLES, TOOL_GET_VEHICLES_BY_BRAND,
    TOOL_GET_VEHICLES_BY_FILTERS, TOOL_GET_VEHICLES_BY_PRICE,
};
use carlot_db::InventoryRepository;

use crate::tools::{self, BrandParams, FilterParams, PriceParams};
use crate::McpResult;

/// Main MCP server for the dealership inventory
#[derive(Clone)]
pub struct CarlotMcpServer {
    repository: Arc<dyn InventoryRepository>,
    tool_router: ToolRouter<Self>,
}

impl CarlotMcpServer {
    pub fn new(repository: Arc<dyn InventoryRepository>) -> Self {
        Self { repository, tool_router: Self::tool_router() }
    }

    /// Run the server with stdio transport until the client disconnects.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!(event_name = "mcp.server.starting", transport = "stdio", "starting MCP server");

        let transport = rmcp::transport::io::stdio();
        let service = rmcp::serve_server(self, transport).await?;
        let _quit = service.waiting().await?;

        info!(event_name = "mcp.server.stopped", "MCP server shutdown complete");
        Ok(())
    }
}

/// Tool errors go back to the caller as error results so the client can
/// retry; the JSON-RPC code is kept for the log.
fn respond(tool_name: &'static str, result: McpResult<String>) -> Result<String, String> {
    result.map_err(|error| {
        warn!(
            event_name = "mcp.tool.failed",
            tool_name,
            error_code = error.error_code(),
            error = %error,
            "tool call failed"
        );
        error.to_string()
    })
}

fn resource(uri: &str, name: &str, description: &str) -> Resource {
    RawResource {
        description: Some(description.into()),
        mime_type: Some("application/json".into()),
        ..RawResource::new(uri, name)
    }
    .no_annotation()
}

#[tool_router]
impl CarlotMcpServer {
    #[tool(description = "Lista todos os veículos disponíveis no estoque.")]
    async fn get_vehicles(&self) -> Result<String, String> {
        respond(TOOL_GET_VEHICLES, tools::get_vehicles(self.repository.as_ref()).await)
    }

    #[tool(
        description = "Busca veículos aplicando filtros. Parâmetros vazios ou zerados são ignorados."
    )]
    async fn get_vehicles_by_filters(
        &self,
        Parameters(req): Parameters<FilterParams>,
    ) -> Result<String, String> {
        respond(
            TOOL_GET_VEHICLES_BY_FILTERS,
            tools::get_vehicles_by_filters(self.repository.as_ref(), req).await,
        )
    }

    #[tool(description = "Lista as marcas disponíveis no estoque.")]
    async fn get_available_brands(&self) -> Result<String, String> {
        respond(TOOL_GET_AVAILABLE_BRANDS, tools::get_available_brands(self.repository.as_ref()).await)
    }

    #[tool(description = "Busca todos os veículos de uma marca.")]
    async fn get_vehicles_by_brand(
        &self,
        Parameters(req): Parameters<BrandParams>,
    ) -> Result<String, String> {
        respond(
            TOOL_GET_VEHICLES_BY_BRAND,
            tools::get_vehicles_by_brand(self.repository.as_ref(), req).await,
        )
    }

    #[tool(description = "Busca veículos dentro de uma faixa de preço.")]
    async fn get_vehicles_by_price(
        &self,
        Parameters(req): Parameters<PriceParams>,
    ) -> Result<String, String> {
        respond(
            TOOL_GET_VEHICLES_BY_PRICE,
            tools::get_vehicles_by_price(self.repository.as_ref(), req).await,
        )
    }
}

impl ServerHandler for CarlotMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().enable_resources().build(),
            server_info: rmcp::model::Implementation {
                name: "carlot-mcp".into(),
                title: Some("Carlot vehicle inventory".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Consulta ao estoque de veículos: listagem completa, marcas, filtros, marca e faixa de preço. \
                 Recursos vehicles://all e vehicles://brands trazem o estoque e as marcas."
                    .into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        }))
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult::with_all_items(vec![
            resource(RESOURCE_ALL_VEHICLES, "vehicles", "Todos os veículos do estoque."),
            resource(RESOURCE_BRANDS, "brands", "Marcas disponíveis, em ordem alfabética."),
        ])))
    }

    #[allow(clippy::manual_async_fn)]
    fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, ErrorData>> + Send + '_ {
        async move {
            let uri = request.uri;
            match tools::read_resource(self.repository.as_ref(), &uri).await {
                Ok(Some(body)) => {
                    Ok(ReadResourceResult { contents: vec![ResourceContents::text(body, uri)] })
                }
                Ok(None) => Err(ErrorData::resource_not_found(
                    format!("unknown resource `{uri}`"),
                    None,
                )),
                Err(error) => {
                    warn!(
                        event_name = "mcp.resource.failed",
                        uri = %uri,
                        error_code = error.error_code(),
                        error = %error,
                        "resource read failed"
                    );
                    Err(ErrorData::internal_error(error.to_string(), None))
                }
            }
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let ctx = ToolCallContext::new(self, request, context);
            self.tool_router.call(ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use carlot_core::inventory::ALL_TOOL_NAMES;
    use carlot_db::{demo_vehicles, InMemoryInventoryRepository};
    use rmcp::ServerHandler;

    use super::CarlotMcpServer;

    fn server() -> CarlotMcpServer {
        CarlotMcpServer::new(Arc::new(InMemoryInventoryRepository::with_vehicles(demo_vehicles())))
    }

    #[test]
    fn router_registers_every_inventory_tool() {
        let tools = server().tool_router.list_all();
        let mut names = tools.iter().map(|tool| tool.name.to_string()).collect::<Vec<_>>();
        names.sort();

        let mut expected = ALL_TOOL_NAMES.iter().map(|name| name.to_string()).collect::<Vec<_>>();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn server_info_advertises_tools() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, "carlot-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[tokio::test]
    async fn tool_methods_delegate_to_repository() {
        let payload = server().get_available_brands().await.expect("brands");
        assert!(payload.contains("\"total_marcas\""));
    }
}
