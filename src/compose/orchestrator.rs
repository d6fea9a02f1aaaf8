//! Fig orchestrator

use super::config::FigConfig;
use super::parser::FigParser;
use super::scale::{compute_scale_plan, ScalePlan};
use super::schedule::order_by_dependency;
use super::service::Service;
use crate::container::{
    container_name, list_runtime_containers, Container, LinkAlias, RunSpec, RuntimeDriver,
};
use crate::error::{IchijikuError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fig orchestrator
///
/// Owns the services of one project. Container sets are only as fresh as the
/// last [`Orchestrator::reconcile`] call.
pub struct Orchestrator {
    /// Namespace scoping all container names
    namespace: String,
    /// Services, sorted by name
    services: Vec<Service>,
    /// Runtime driver
    driver: Arc<dyn RuntimeDriver>,
    /// Directory build contexts are resolved against
    working_dir: PathBuf,
}

impl Orchestrator {
    /// Initialize every service of a fig file
    ///
    /// Fails before any runtime call if a link points at an unknown service.
    pub fn new(namespace: &str, config: FigConfig, driver: Arc<dyn RuntimeDriver>) -> Result<Self> {
        if namespace.is_empty() {
            return Err(IchijikuError::Config(
                "Project name has no usable characters".to_string(),
            ));
        }

        for warning in FigParser::validate(&config)? {
            warn!("{}", warning);
        }

        let mut services = config
            .into_iter()
            .map(|(name, service)| Service::new(namespace, &name, service))
            .collect::<Result<Vec<_>>>()?;
        services.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            namespace: namespace.to_string(),
            services,
            driver,
            working_dir: PathBuf::from("."),
        })
    }

    /// Resolve build contexts against `dir`
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Project namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// All services, sorted by name
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Look up a service by name
    pub fn service(&self, name: &str) -> Result<&Service> {
        self.services
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| IchijikuError::ServiceNotFound(name.to_string()))
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.services
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| IchijikuError::ServiceNotFound(name.to_string()))
    }

    /// Resolve service names; an empty selection means every service
    pub fn select(&self, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(self.services.iter().map(|s| s.name.clone()).collect());
        }

        names
            .iter()
            .map(|name| self.service(name).map(|s| s.name.clone()))
            .collect()
    }

    /// Selected service names in dependency order
    pub fn start_order(&self, names: &[String]) -> Result<Vec<String>> {
        let selected = self
            .select(names)?
            .iter()
            .map(|name| self.service(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(order_by_dependency(selected)
            .into_iter()
            .map(|s| s.name.clone())
            .collect())
    }

    /// Rebuild every service's container set from the runtime
    ///
    /// Container sets are cleared first, so the result only ever reflects the
    /// latest query.
    pub async fn reconcile(&mut self) -> Result<()> {
        for service in &mut self.services {
            service.containers.clear();
        }

        let mut records = list_runtime_containers(self.driver.as_ref()).await?;
        while let Some(record) = records.recv().await {
            let record = record?;

            let Some(service) = self
                .services
                .iter_mut()
                .find(|s| s.matches_container(&record.name))
            else {
                continue;
            };

            let container = Container::from_record(&service.name, record)?;
            debug!("Found container {} for service {}", container.name, service.name);
            service.containers.push(container);
        }

        Ok(())
    }

    /// Everything needed to run replica `index` of `service`
    pub fn run_spec(&self, service: &Service, index: u32) -> Result<RunSpec> {
        let config = &service.config;

        let links = service
            .links
            .iter()
            .filter_map(|link| {
                self.services
                    .iter()
                    .find(|s| s.name == link.target)
                    .map(|target| (link, target))
            })
            .flat_map(|(link, target)| {
                target
                    .sorted_containers()
                    .into_iter()
                    .map(move |linked| LinkAlias {
                        container: linked.name.clone(),
                        alias: format!("{}_{}", link.alias, linked.index),
                    })
            })
            .collect();

        let command = match &config.command {
            Some(command) => command.to_args()?,
            None => Vec::new(),
        };
        let run_flags = match &config.run_flags {
            Some(flags) => flags.to_args()?,
            None => Vec::new(),
        };

        Ok(RunSpec {
            name: container_name(&self.namespace, &service.name, index),
            image: service.image(),
            command,
            ports: config.ports.clone(),
            volumes: config.volumes.clone(),
            environment: config
                .environment
                .as_ref()
                .map(|e| e.to_map())
                .unwrap_or_default(),
            links,
            net: config.net.clone(),
            working_dir: config.working_dir.clone(),
            entrypoint: config.entrypoint.clone(),
            hostname: config.hostname.clone(),
            user: config.user.clone(),
            mem_limit: config.mem_limit.clone(),
            privileged: config.privileged,
            run_flags,
        })
    }

    /// Scale a service to `target` containers
    ///
    /// Holes in the index sequence are filled before new indices are
    /// appended; scaling down removes the highest indices first. The first
    /// failing runtime call aborts the pass and what already happened stays.
    pub async fn scale(&mut self, service_name: &str, target: usize) -> Result<ScalePlan> {
        let position = self.position(service_name)?;
        let plan = compute_scale_plan(&self.services[position].indices(), target)?;

        if plan.is_empty() {
            info!("Service {} already has {} containers", service_name, target);
            return Ok(plan);
        }

        info!("Scaling service {} to {} containers", service_name, target);
        let driver = self.driver.clone();

        for &index in &plan.to_create {
            let spec = self.run_spec(&self.services[position], index)?;
            info!("Creating {}", spec.name);
            driver.run(&spec).await?;

            let service = &mut self.services[position];
            service
                .containers
                .push(Container::new(&service.namespace, &service.name, index));
        }

        for &index in plan.to_remove.iter().rev() {
            let service = &self.services[position];
            let Some(slot) = service.containers.iter().position(|c| c.index == index) else {
                continue;
            };
            let name = service.containers[slot].name.clone();

            info!("Removing {}", name);
            driver.force_remove(&name).await?;
            self.services[position].containers.remove(slot);
        }

        Ok(plan)
    }

    /// Scale several services, checking every name before touching the runtime
    pub async fn scale_all(&mut self, targets: &[(String, usize)]) -> Result<()> {
        for (name, _) in targets {
            self.service(name)?;
        }

        for (name, target) in targets {
            self.scale(name, *target).await?;
        }

        Ok(())
    }

    /// Build images for services that use a build context
    pub async fn build(&self, names: &[String]) -> Result<()> {
        for name in self.select(names)? {
            let service = self.service(&name)?;

            match (&service.config.image, &service.config.build) {
                (Some(_), _) => info!("{} uses an image, skipping", name),
                (None, Some(context)) => {
                    info!("Building {}", service);
                    let context = self.working_dir.join(context);
                    self.driver
                        .build(&service.build_tag(), &context.to_string_lossy())
                        .await?;
                }
                (None, None) => warn!("{} has no build context, skipping", name),
            }
        }

        Ok(())
    }

    /// Recreate containers of the selected services in dependency order
    ///
    /// Existing containers are replaced at the same index; a service with no
    /// containers gets index 1.
    pub async fn up(&mut self, names: &[String]) -> Result<()> {
        let driver = self.driver.clone();

        for name in self.start_order(names)? {
            let position = self.position(&name)?;
            let mut indices = self.services[position].indices();
            if indices.is_empty() {
                indices.push(1);
            }

            info!("Starting service {} ({} containers)", name, indices.len());

            for index in indices {
                let spec = self.run_spec(&self.services[position], index)?;

                if let Err(e) = driver.force_remove(&spec.name).await {
                    debug!("Nothing removed for {}: {}", spec.name, e);
                }
                driver.run(&spec).await?;

                let service = &mut self.services[position];
                service.containers.retain(|c| c.index != index);
                service
                    .containers
                    .push(Container::new(&service.namespace, &service.name, index));
            }
        }

        Ok(())
    }

    /// Start existing containers, dependencies first
    pub async fn start(&self, names: &[String]) -> Result<()> {
        for name in self.start_order(names)? {
            for container in self.service(&name)?.sorted_containers() {
                info!("Starting {}", container.name);
                self.driver.start(&container.name).await?;
            }
        }

        Ok(())
    }

    /// Stop running containers, dependents first
    pub async fn stop(&self, names: &[String]) -> Result<()> {
        for name in self.start_order(names)?.into_iter().rev() {
            for container in self.service(&name)?.sorted_containers() {
                info!("Stopping {}", container.name);
                self.driver.stop(&container.name).await?;
            }
        }

        Ok(())
    }

    /// Kill running containers, dependents first
    pub async fn kill(&self, names: &[String]) -> Result<()> {
        for name in self.start_order(names)?.into_iter().rev() {
            for container in self.service(&name)?.sorted_containers() {
                info!("Killing {}", container.name);
                self.driver.kill(&container.name).await?;
            }
        }

        Ok(())
    }

    /// Containers of the selected services, grouped by service and sorted by index
    pub fn containers(&self, names: &[String]) -> Result<Vec<&Container>> {
        let mut containers = Vec::new();
        for name in self.select(names)? {
            containers.extend(self.service(&name)?.sorted_containers());
        }
        Ok(containers)
    }
}
